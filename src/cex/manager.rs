// SPDX-License-Identifier: Apache-2.0

//! A counterexample session: turns SAT models into verified, compressed
//! patterns and later packs them into simulation vectors.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cex::codec::PatternStore;
use crate::cex::error::CexResult;
use crate::cex::extract::{evaluate_output, shrink_pattern};
use crate::cex::graph::{CexGraph, SatModel};
use crate::cex::pack::{PackOptions, PackedPatterns, pack_patterns};
use crate::cex::pattern::PatLit;
use crate::cex::scratch::TravScratch;
use crate::cex::ternary::verify_pattern;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CexPatOptions {
    /// Report packing summaries and session statistics at info level.
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CexPatStats {
    /// Patterns saved since the last `start_batch`.
    pub pats: usize,
    pub pats_all: usize,
    /// Cone input counts of the saved outputs, summed.
    pub pat_lits: usize,
    pub pat_lits_all: usize,
    /// Literals in the saved patterns, summed.
    pub pat_lits_min: usize,
    pub pat_lits_min_all: usize,
    /// Width multiplier of the most recent packing.
    pub series: usize,
    pub time_find: Duration,
    pub time_shrink: Duration,
    pub time_verify: Duration,
    pub time_sort: Duration,
    pub time_pack: Duration,
    pub time_total: Duration,
}

impl CexPatStats {
    fn average(total: usize, count: usize) -> f64 {
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "patterns = {} (batch {}) cone inputs avg = {:.2} pattern lits avg = {:.2} \
             find = {:?} shrink = {:?} verify = {:?} sort = {:?} pack = {:?} total = {:?}",
            self.pats_all,
            self.pats,
            Self::average(self.pat_lits_all, self.pats_all),
            Self::average(self.pat_lits_min_all, self.pats_all),
            self.time_find,
            self.time_shrink,
            self.time_verify,
            self.time_sort,
            self.time_pack,
            self.time_total
        )
    }
}

/// Owns the pattern store and traversal scratch of one session.
///
/// Not internally synchronized: every operation takes `&mut self`, so sharing
/// a manager across threads needs an external lock.
#[derive(Debug, Default)]
pub struct CexPatManager {
    options: CexPatOptions,
    store: PatternStore,
    scratch: TravScratch,
    stats: CexPatStats,
}

impl CexPatManager {
    pub fn new(options: CexPatOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> &CexPatStats {
        &self.stats
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    /// Resets the per-batch counters; session totals are kept.
    pub fn start_batch(&mut self) {
        self.stats.pats = 0;
        self.stats.pat_lits = 0;
        self.stats.pat_lits_min = 0;
    }

    /// Extracts a pattern for `output` from `model`, verifies it by ternary
    /// simulation, and appends it (sorted) to the store. Returns the stored
    /// pattern.
    ///
    /// Nothing is stored when any stage fails.
    pub fn save_pattern<G, M>(
        &mut self,
        graph: &G,
        model: &M,
        output: usize,
    ) -> CexResult<Vec<PatLit>>
    where
        G: CexGraph + ?Sized,
        M: SatModel + ?Sized,
    {
        let total_start = Instant::now();

        let start = Instant::now();
        let evaluation = evaluate_output(graph, model, &mut self.scratch, output)?;
        self.stats.time_find += start.elapsed();

        let start = Instant::now();
        let extraction = shrink_pattern(graph, &mut self.scratch, &evaluation)?;
        self.stats.time_shrink += start.elapsed();

        let start = Instant::now();
        verify_pattern(graph, &mut self.scratch, output, &extraction.pattern)?;
        self.stats.time_verify += start.elapsed();

        let start = Instant::now();
        let mut pattern = extraction.pattern;
        pattern.sort_unstable();
        self.stats.time_sort += start.elapsed();

        self.store.store(&pattern)?;

        self.stats.pats += 1;
        self.stats.pats_all += 1;
        self.stats.pat_lits += extraction.cone_inputs;
        self.stats.pat_lits_all += extraction.cone_inputs;
        self.stats.pat_lits_min += pattern.len();
        self.stats.pat_lits_min_all += pattern.len();
        self.stats.time_total += total_start.elapsed();
        log::debug!(
            "save_pattern: output {} cone inputs {} pattern lits {} store bytes {}",
            output,
            extraction.cone_inputs,
            pattern.len(),
            self.store.len()
        );
        Ok(pattern)
    }

    /// Packs every stored pattern into simulation vectors over `input_count`
    /// inputs. The store is left as it was.
    pub fn collect_patterns(
        &mut self,
        input_count: usize,
        init_words: usize,
        rng: &mut impl Rng,
    ) -> CexResult<PackedPatterns> {
        let options = PackOptions {
            init_words,
            verbose: self.options.verbose,
        };
        let start = Instant::now();
        let packed = pack_patterns(&mut self.store, input_count, &options, rng)?;
        let elapsed = start.elapsed();
        self.stats.time_pack += elapsed;
        self.stats.time_total += elapsed;
        self.stats.series = packed.stats.series;
        Ok(packed)
    }

    pub fn log_stats(&self) {
        if self.options.verbose {
            log::info!("log_stats: {}", self.stats.summary());
        } else {
            log::debug!("log_stats: {}", self.stats.summary());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::gate::{AigOperand, AigRef, GateFn};
    use crate::aig::gate_builder::{GateBuilder, GateBuilderOptions};
    use crate::cex::error::CexError;
    use crate::cex::graph::{GateFnGraph, NodeKind};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// o0 = a & !b, o1 = b | c
    fn two_outputs() -> GateFn {
        let mut gb = GateBuilder::new("two".to_string(), GateBuilderOptions::opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let c = *gb.add_input("c".to_string(), 1).get_lsb(0);
        let o0 = gb.add_and_binary(a, b.negate());
        let o1 = gb.add_or_binary(b, c);
        gb.add_output("o0".to_string(), o0.into());
        gb.add_output("o1".to_string(), o1.into());
        gb.build()
    }

    #[test]
    fn test_save_pattern_stores_sorted_pattern_and_counts() {
        let _ = env_logger::builder().is_test(true).try_init();
        let gate_fn = two_outputs();
        let graph = GateFnGraph::new(&gate_fn);
        let mut manager = CexPatManager::new(CexPatOptions::default());

        let a_hi_b_lo = |node: AigRef| node == gate_fn.flat_input_refs()[0];
        let pattern = manager.save_pattern(&graph, &a_hi_b_lo, 0).unwrap();
        assert_eq!(pattern, vec![PatLit::from_raw(0), PatLit::from_raw(3)]);

        let all_hi = |_node: AigRef| true;
        let pattern = manager.save_pattern(&graph, &all_hi, 1).unwrap();
        assert_eq!(pattern.len(), 1);

        assert_eq!(manager.stats().pats, 2);
        assert_eq!(manager.stats().pat_lits, 4);
        assert_eq!(manager.stats().pat_lits_min, 3);
        assert_eq!(manager.store().restore_all().unwrap().len(), 2);

        manager.start_batch();
        assert_eq!(manager.stats().pats, 0);
        assert_eq!(manager.stats().pats_all, 2);
        assert_eq!(manager.stats().pat_lits_min_all, 3);
        manager.log_stats();
    }

    #[test]
    fn test_rejected_model_leaves_store_untouched() {
        let gate_fn = two_outputs();
        let graph = GateFnGraph::new(&gate_fn);
        let mut manager = CexPatManager::new(CexPatOptions::default());
        let all_lo = |_node: AigRef| false;
        assert!(matches!(
            manager.save_pattern(&graph, &all_lo, 1),
            Err(CexError::PreconditionViolation { .. })
        ));
        assert!(manager.store().is_empty());
        assert_eq!(manager.stats().pats_all, 0);
    }

    /// Reports one AND as having both fan-ins on `a`, so evaluation and the
    /// justification walk see a different circuit than ternary simulation.
    struct LyingGraph<'a> {
        inner: GateFnGraph<'a>,
        liar: AigRef,
        truth: [AigOperand; 2],
        calls: std::cell::Cell<usize>,
    }

    impl CexGraph for LyingGraph<'_> {
        fn node_count(&self) -> usize {
            self.inner.node_count()
        }
        fn node_kind(&self, node: AigRef) -> NodeKind {
            self.inner.node_kind(node)
        }
        fn fanins(&self, node: AigRef) -> Option<[AigOperand; 2]> {
            if node != self.liar {
                return self.inner.fanins(node);
            }
            // Cone evaluation takes three lookups and each justification walk
            // one; only ternary re-simulation after that sees the real gate.
            let calls = self.calls.get();
            self.calls.set(calls + 1);
            if calls < 5 {
                Some([self.truth[0], self.truth[0]])
            } else {
                Some(self.truth)
            }
        }
        fn input_count(&self) -> usize {
            self.inner.input_count()
        }
        fn input_index(&self, node: AigRef) -> Option<usize> {
            self.inner.input_index(node)
        }
        fn input_node(&self, index: usize) -> Option<AigRef> {
            self.inner.input_node(index)
        }
        fn output_count(&self) -> usize {
            self.inner.output_count()
        }
        fn output_driver(&self, output: usize) -> Option<AigOperand> {
            self.inner.output_driver(output)
        }
    }

    #[test]
    fn test_verification_failure_stores_nothing() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut gb = GateBuilder::new("and".to_string(), GateBuilderOptions::opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let o = gb.add_and_binary(a, b);
        gb.add_output("o".to_string(), o.into());
        let gate_fn = gb.build();
        let inner = GateFnGraph::new(&gate_fn);
        let truth = inner.fanins(o.node).unwrap();
        let graph = LyingGraph {
            inner,
            liar: o.node,
            truth,
            calls: std::cell::Cell::new(0),
        };
        let mut manager = CexPatManager::new(CexPatOptions::default());
        let a_node = a.node;
        let model = move |node: AigRef| node == a_node;
        let result = manager.save_pattern(&graph, &model, 0);
        assert!(
            matches!(result, Err(CexError::VerificationFailure { output: 0, .. })),
            "got {:?}",
            result
        );
        assert!(manager.store().is_empty());
        assert_eq!(manager.stats().pats_all, 0);
    }

    #[test]
    fn test_collect_patterns_records_series() {
        let gate_fn = two_outputs();
        let graph = GateFnGraph::new(&gate_fn);
        let mut manager = CexPatManager::new(CexPatOptions { verbose: true });
        let all_hi = |_node: AigRef| true;
        manager.save_pattern(&graph, &all_hi, 1).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let packed = manager
            .collect_patterns(graph.input_count(), 1, &mut rng)
            .unwrap();
        assert_eq!(packed.stats.pattern_count, 1);
        assert_eq!(packed.columns, vec![1]);
        assert_eq!(manager.stats().series, 1);
        // The store is not consumed.
        let again = manager
            .collect_patterns(graph.input_count(), 1, &mut rng)
            .unwrap();
        assert_eq!(again.stats.pattern_count, 1);
    }
}
