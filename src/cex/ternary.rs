// SPDX-License-Identifier: Apache-2.0

//! Three-valued re-simulation used to certify extracted patterns.
//!
//! Inputs named by the pattern are fixed to their required values and every
//! other input is X; the output must still come out as a definite one. This
//! recomputes the cone from scratch and shares nothing with the extraction
//! walk other than the graph itself.

use crate::aig::gate::{AigOperand, AigRef};
use crate::cex::error::{CexError, CexResult};
use crate::cex::graph::{CexGraph, NodeKind};
use crate::cex::pattern::PatLit;
use crate::cex::scratch::TravScratch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryValue {
    Zero,
    One,
    X,
}

impl TernaryValue {
    pub fn from_bool(value: bool) -> Self {
        if value {
            TernaryValue::One
        } else {
            TernaryValue::Zero
        }
    }

    #[must_use]
    pub fn not_if(self, negate: bool) -> Self {
        match (self, negate) {
            (TernaryValue::Zero, true) => TernaryValue::One,
            (TernaryValue::One, true) => TernaryValue::Zero,
            (value, _) => value,
        }
    }

    /// AND over the lattice: zero dominates, one needs both sides one.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (TernaryValue::Zero, _) | (_, TernaryValue::Zero) => TernaryValue::Zero,
            (TernaryValue::One, TernaryValue::One) => TernaryValue::One,
            _ => TernaryValue::X,
        }
    }

    /// Two-bit encoding as (mark0, mark1): zero = 01, one = 10, X = 11.
    fn to_marks(self) -> (bool, bool) {
        match self {
            TernaryValue::Zero => (true, false),
            TernaryValue::One => (false, true),
            TernaryValue::X => (true, true),
        }
    }

    fn from_marks(mark0: bool, mark1: bool) -> Self {
        match (mark0, mark1) {
            (true, false) => TernaryValue::Zero,
            (false, true) => TernaryValue::One,
            _ => TernaryValue::X,
        }
    }
}

fn store(scratch: &mut TravScratch, node: AigRef, value: TernaryValue) {
    let (mark0, mark1) = value.to_marks();
    scratch.set_mark0(node, mark0);
    scratch.set_mark1(node, mark1);
}

fn load(scratch: &TravScratch, operand: AigOperand) -> TernaryValue {
    TernaryValue::from_marks(scratch.mark0(operand.node), scratch.mark1(operand.node))
        .not_if(operand.negated)
}

/// Ternary value of `output` when only the inputs in `pattern` are known.
pub fn simulate_pattern<G>(
    graph: &G,
    scratch: &mut TravScratch,
    output: usize,
    pattern: &[PatLit],
) -> CexResult<TernaryValue>
where
    G: CexGraph + ?Sized,
{
    let driver = graph.output_driver(output).ok_or_else(|| {
        CexError::precondition(format!(
            "output {} does not exist ({} outputs)",
            output,
            graph.output_count()
        ))
    })?;
    scratch.ensure_nodes(graph.node_count());
    scratch.increment_trav_id();
    for lit in pattern {
        let node = graph.input_node(lit.input_index()).ok_or_else(|| {
            CexError::precondition(format!(
                "pattern literal {} names input {} but the graph has {} inputs",
                lit.raw(),
                lit.input_index(),
                graph.input_count()
            ))
        })?;
        store(scratch, node, TernaryValue::from_bool(lit.required_value()));
        scratch.set_trav_id_current(node);
    }
    for node in scratch.cone_postorder(graph, driver.node)? {
        let value = match graph.node_kind(node) {
            NodeKind::Input => TernaryValue::X,
            _ => {
                let [f0, f1] = graph.fanins(node).ok_or_else(|| {
                    CexError::precondition(format!("AND node %{} has no fan-ins", node.id))
                })?;
                load(scratch, f0).and(load(scratch, f1))
            }
        };
        store(scratch, node, value);
    }
    Ok(load(scratch, driver))
}

/// Confirms that `pattern` alone forces `output` to one.
pub fn verify_pattern<G>(
    graph: &G,
    scratch: &mut TravScratch,
    output: usize,
    pattern: &[PatLit],
) -> CexResult<()>
where
    G: CexGraph + ?Sized,
{
    let value = simulate_pattern(graph, scratch, output, pattern)?;
    if value != TernaryValue::One {
        log::error!(
            "verify_pattern: output {} evaluates to {:?} under a pattern of {} literals",
            output,
            value,
            pattern.len()
        );
        return Err(CexError::VerificationFailure {
            output,
            pattern: pattern.to_vec(),
        });
    }
    Ok(())
}
