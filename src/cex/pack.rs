// SPDX-License-Identifier: Apache-2.0

//! Packs stored patterns into word-parallel simulation vectors.
//!
//! Every input gets a row of `32 * words` bits; each column is one simulation
//! sample. A second matrix of the same shape records which (input, column)
//! cells some pattern has already claimed. A pattern goes into the first
//! column where none of its inputs is claimed with the opposite value; cells
//! it does not mention keep their random seed value. When no column fits the
//! matrix doubles in width.
//!
//! The first column of every block of `32 * init_words` columns is never
//! assigned, so it keeps a purely random sample.

use bitvec::prelude::{BitVec, Lsb0};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cex::codec::PatternStore;
use crate::cex::error::{CexError, CexResult};
use crate::cex::pattern::{PatLit, check_pattern_sorted};

pub const BITS_PER_WORD: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackOptions {
    /// Initial row width in 32-bit words.
    pub init_words: usize,
    /// Report the packing summary at info level instead of debug.
    pub verbose: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            init_words: 4,
            verbose: false,
        }
    }
}

type Row = BitVec<u32, Lsb0>;

/// One bit-row per primary input, all of the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimMatrix {
    words: usize,
    rows: Vec<Row>,
}

impl SimMatrix {
    pub fn zeros(input_count: usize, words: usize) -> Self {
        Self {
            words,
            rows: (0..input_count)
                .map(|_| Row::repeat(false, words * BITS_PER_WORD))
                .collect(),
        }
    }

    pub fn random(input_count: usize, words: usize, rng: &mut impl Rng) -> Self {
        Self {
            words,
            rows: (0..input_count)
                .map(|_| Row::from_vec((0..words).map(|_| rng.next_u32()).collect()))
                .collect(),
        }
    }

    pub fn input_count(&self) -> usize {
        self.rows.len()
    }

    pub fn words(&self) -> usize {
        self.words
    }

    pub fn column_count(&self) -> usize {
        self.words * BITS_PER_WORD
    }

    pub fn get(&self, input: usize, column: usize) -> bool {
        self.rows[input][column]
    }

    pub fn set(&mut self, input: usize, column: usize, value: bool) {
        self.rows[input].set(column, value);
    }

    /// Raw simulation words of `input`; bit `k` of the row is bit `k % 32` of
    /// word `k / 32`.
    pub fn row_words(&self, input: usize) -> &[u32] {
        self.rows[input].as_raw_slice()
    }

    /// Doubles the width; the new columns are filled from `rng` when given,
    /// zero otherwise. Existing columns are untouched.
    fn double(&mut self, rng: Option<&mut dyn FnMut() -> u32>) {
        let old_words = self.words;
        match rng {
            Some(next) => {
                for row in self.rows.iter_mut() {
                    let fresh: Vec<u32> = (0..old_words).map(|_| next()).collect();
                    row.extend_from_raw_slice(&fresh);
                }
            }
            None => {
                for row in self.rows.iter_mut() {
                    row.resize(2 * old_words * BITS_PER_WORD, false);
                }
            }
        }
        self.words = 2 * old_words;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackStats {
    pub pattern_count: usize,
    /// Largest column any pattern was committed to.
    pub max_column: Option<usize>,
    /// Column count of the initial width.
    pub init_columns: usize,
    /// Final width as a multiple of the initial width.
    pub series: usize,
    pub words: usize,
}

#[derive(Debug, Clone)]
pub struct PackedPatterns {
    pub values: SimMatrix,
    pub presence: SimMatrix,
    /// Column each pattern was committed to, in packing order.
    pub columns: Vec<usize>,
    pub stats: PackStats,
}

pub struct PatternPacker {
    init_words: usize,
    values: SimMatrix,
    presence: SimMatrix,
    columns: Vec<usize>,
}

impl PatternPacker {
    pub fn new(input_count: usize, init_words: usize, rng: &mut impl Rng) -> CexResult<Self> {
        if init_words == 0 {
            return Err(CexError::precondition(
                "packing needs an initial width of at least one word",
            ));
        }
        Ok(Self {
            init_words,
            values: SimMatrix::random(input_count, init_words, rng),
            presence: SimMatrix::zeros(input_count, init_words),
            columns: Vec::new(),
        })
    }

    pub fn values(&self) -> &SimMatrix {
        &self.values
    }

    pub fn presence(&self) -> &SimMatrix {
        &self.presence
    }

    fn is_reserved(&self, column: usize) -> bool {
        column % (self.init_words * BITS_PER_WORD) == 0
    }

    fn fits(&self, column: usize, pattern: &[PatLit]) -> bool {
        pattern.iter().all(|lit| {
            let input = lit.input_index();
            !self.presence.get(input, column) || self.values.get(input, column) != lit.is_compl()
        })
    }

    fn commit(&mut self, column: usize, pattern: &[PatLit]) {
        for lit in pattern {
            let input = lit.input_index();
            self.presence.set(input, column, true);
            if self.values.get(input, column) == lit.is_compl() {
                self.values.set(input, column, !lit.is_compl());
            }
        }
    }

    fn grow(&mut self, rng: &mut impl Rng) {
        let mut next = || rng.next_u32();
        self.values.double(Some(&mut next));
        self.presence.double(None);
        log::trace!("PatternPacker::grow: now {} words", self.values.words());
    }

    /// Commits `pattern` to the first compatible column, growing the matrix as
    /// needed, and returns that column.
    ///
    /// `pattern` must be sorted and name each input once.
    pub fn add(&mut self, pattern: &[PatLit], rng: &mut impl Rng) -> CexResult<usize> {
        check_pattern_sorted(pattern)?;
        if let Some(lit) = pattern
            .iter()
            .find(|lit| lit.input_index() >= self.values.input_count())
        {
            return Err(CexError::precondition(format!(
                "pattern {} names input {} but there are {} inputs",
                self.columns.len(),
                lit.input_index(),
                self.values.input_count()
            )));
        }
        let mut start = 1;
        let column = loop {
            let end = self.values.column_count();
            let found = (start..end).find(|&k| !self.is_reserved(k) && self.fits(k, pattern));
            match found {
                Some(k) => break k,
                None => {
                    self.grow(rng);
                    start = end;
                }
            }
        };
        self.commit(column, pattern);
        if column == self.values.column_count() - 1 {
            self.grow(rng);
        }
        self.columns.push(column);
        Ok(column)
    }

    pub fn finish(self) -> PackedPatterns {
        let stats = PackStats {
            pattern_count: self.columns.len(),
            max_column: self.columns.iter().copied().max(),
            init_columns: self.init_words * BITS_PER_WORD,
            series: self.values.words() / self.init_words,
            words: self.values.words(),
        };
        PackedPatterns {
            values: self.values,
            presence: self.presence,
            columns: self.columns,
            stats,
        }
    }
}

/// Packs every pattern in `store`, from the first one, into a fresh matrix
/// over `input_count` inputs. The store's read cursor is left where it was.
pub fn pack_patterns(
    store: &mut PatternStore,
    input_count: usize,
    options: &PackOptions,
    rng: &mut impl Rng,
) -> CexResult<PackedPatterns> {
    let saved_cursor = store.cursor();
    store.rewind();
    let result = pack_from_cursor(store, input_count, options, rng);
    store.set_cursor(saved_cursor)?;
    let packed = result?;
    let stats = &packed.stats;
    let summary = format!(
        "pack_patterns: total = {} max used = {} full = {} series = {}",
        stats.pattern_count,
        stats.max_column.map_or(-1, |c| c as i64),
        stats.init_columns,
        stats.series
    );
    if options.verbose {
        log::info!("{}", summary);
    } else {
        log::debug!("{}", summary);
    }
    Ok(packed)
}

fn pack_from_cursor(
    store: &mut PatternStore,
    input_count: usize,
    options: &PackOptions,
    rng: &mut impl Rng,
) -> CexResult<PackedPatterns> {
    let mut packer = PatternPacker::new(input_count, options.init_words, rng)?;
    let mut pattern = Vec::new();
    while store.has_more() {
        store.restore(&mut pattern)?;
        packer.add(&pattern, rng)?;
    }
    Ok(packer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn lits(raws: &[u32]) -> Vec<PatLit> {
        raws.iter().map(|r| PatLit::from_raw(*r)).collect()
    }

    /// Every committed cell agrees with every pattern committed to its column.
    fn assert_conflict_free(patterns: &[Vec<PatLit>], packed: &PackedPatterns) {
        for (pattern, column) in patterns.iter().zip(packed.columns.iter()) {
            for lit in pattern {
                assert!(packed.presence.get(lit.input_index(), *column));
                assert_eq!(
                    packed.values.get(lit.input_index(), *column),
                    lit.required_value(),
                    "literal {} at column {}",
                    lit.raw(),
                    column
                );
            }
        }
    }

    #[test]
    fn test_disjoint_patterns_share_a_column() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut packer = PatternPacker::new(4, 1, &mut rng).unwrap();
        assert_eq!(packer.add(&lits(&[0, 2]), &mut rng).unwrap(), 1);
        assert_eq!(packer.add(&lits(&[5, 7]), &mut rng).unwrap(), 1);
        // Same polarity on input 0 is compatible too.
        assert_eq!(packer.add(&lits(&[0]), &mut rng).unwrap(), 1);
        // Opposite polarity on input 0 must move on.
        assert_eq!(packer.add(&lits(&[1]), &mut rng).unwrap(), 2);
    }

    /// Full assignment number `m` over `width` inputs; distinct assignments
    /// conflict pairwise.
    fn full_assignment(m: usize, width: usize) -> Vec<PatLit> {
        (0..width)
            .map(|i| PatLit::with_value(i, (m >> i) & 1 == 1).unwrap())
            .collect()
    }

    #[test]
    fn test_conflicting_patterns_fill_columns_then_grow() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut packer = PatternPacker::new(6, 1, &mut rng).unwrap();
        let mut patterns = Vec::new();
        for m in 0..64 {
            let pattern = full_assignment(m, 6);
            let words_before = packer.values().words();
            let values_before = packer.values().clone();
            let presence_before = packer.presence().clone();
            packer.add(&pattern, &mut rng).unwrap();
            patterns.push(pattern);
            assert!(packer.values().words() >= words_before);
            for input in 0..6 {
                for column in 0..presence_before.column_count() {
                    if presence_before.get(input, column) {
                        assert!(packer.presence().get(input, column));
                        assert_eq!(
                            packer.values().get(input, column),
                            values_before.get(input, column)
                        );
                    }
                }
            }
        }
        let packed = packer.finish();
        assert_conflict_free(&patterns, &packed);
        assert!(packed.columns.iter().all(|c| c % 32 != 0));
        assert_eq!(packed.stats.pattern_count, 64);
        // 1..=31, then 33..=63, then 65 and 66.
        assert_eq!(packed.stats.max_column, Some(66));
        assert_eq!(packed.stats.words, 4);
        assert_eq!(packed.stats.series, 4);
    }

    #[test]
    fn test_last_column_forces_growth() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let mut packer = PatternPacker::new(5, 1, &mut rng).unwrap();
        for m in 0..30 {
            assert_eq!(packer.add(&full_assignment(m, 5), &mut rng).unwrap(), m + 1);
        }
        assert_eq!(packer.values().words(), 1);
        // Column 31 is the last one of a one-word row.
        assert_eq!(packer.add(&full_assignment(30, 5), &mut rng).unwrap(), 31);
        assert_eq!(packer.values().words(), 2);
        // Column 32 is reserved.
        assert_eq!(packer.add(&full_assignment(31, 5), &mut rng).unwrap(), 33);
    }

    #[test]
    fn test_out_of_range_input_is_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut packer = PatternPacker::new(2, 1, &mut rng).unwrap();
        assert!(matches!(
            packer.add(&lits(&[4]), &mut rng),
            Err(CexError::PreconditionViolation { .. })
        ));
        assert!(PatternPacker::new(2, 0, &mut rng).is_err());
    }

    #[test]
    fn test_both_polarities_of_one_input_are_rejected() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let mut packer = PatternPacker::new(2, 1, &mut rng).unwrap();
        assert!(matches!(
            packer.add(&lits(&[0, 1]), &mut rng),
            Err(CexError::PreconditionViolation { .. })
        ));
        assert!(matches!(
            packer.add(&[], &mut rng),
            Err(CexError::PreconditionViolation { .. })
        ));
        assert!(
            (0..packer.presence().column_count()).all(|column| !packer.presence().get(0, column))
        );
        // The next valid pattern still lands in the first free column.
        assert_eq!(packer.add(&lits(&[1]), &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_pack_patterns_is_deterministic_and_keeps_cursor() {
        let mut store = PatternStore::new();
        let patterns = vec![lits(&[0, 3, 6]), lits(&[1, 6]), lits(&[2, 5]), lits(&[7])];
        for pattern in &patterns {
            store.store(pattern).unwrap();
        }
        let mut first = Vec::new();
        store.restore(&mut first).unwrap();
        let cursor = store.cursor();

        let options = PackOptions {
            init_words: 1,
            verbose: false,
        };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let packed_a = pack_patterns(&mut store, 4, &options, &mut rng).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let packed_b = pack_patterns(&mut store, 4, &options, &mut rng).unwrap();

        assert_eq!(store.cursor(), cursor);
        assert_eq!(packed_a.values, packed_b.values);
        assert_eq!(packed_a.columns, packed_b.columns);
        assert_eq!(packed_a.stats.pattern_count, 4);
        assert_conflict_free(&patterns, &packed_a);
    }

    #[test]
    fn test_row_words_layout() {
        let mut matrix = SimMatrix::zeros(1, 2);
        matrix.set(0, 33, true);
        assert_eq!(matrix.row_words(0), &[0, 2]);
        let mut n = 0u32;
        let mut next = || {
            n += 1;
            n
        };
        matrix.double(Some(&mut next));
        assert_eq!(matrix.row_words(0), &[0, 2, 1, 2]);
        assert_eq!(matrix.column_count(), 128);
    }
}
