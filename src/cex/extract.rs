// SPDX-License-Identifier: Apache-2.0

//! Derives a small set of input literals that justifies a failing output.
//!
//! Given a SAT model under which an output evaluates to one, we first
//! evaluate the output's fan-in cone under that model and then walk back
//! from the output keeping only the inputs needed to force the value: an AND
//! at one needs both fan-ins, an AND at zero needs just one controlling
//! fan-in. When both fan-ins of a zero AND are controlling the choice is
//! arbitrary, so we run the walk twice (preferring the first fan-in, then the
//! second) and keep the smaller result.

use crate::aig::gate::{AigOperand, AigRef};
use crate::cex::error::{CexError, CexResult};
use crate::cex::graph::{CexGraph, NodeKind, SatModel};
use crate::cex::pattern::PatLit;
use crate::cex::scratch::TravScratch;

/// Which fan-in the justification walk follows when both fan-ins of an AND
/// at zero are controlling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaninPreference {
    First,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Selected literals, in discovery order (not sorted).
    pub pattern: Vec<PatLit>,
    /// Number of distinct inputs in the output's cone.
    pub cone_inputs: usize,
    pub first_len: usize,
    pub second_len: usize,
}

fn operand_value(scratch: &TravScratch, operand: AigOperand) -> bool {
    scratch.mark1(operand.node) ^ operand.negated
}

/// Evaluates the cone of `root` under `model`, leaving every node's value in
/// mark1. Returns the number of distinct inputs in the cone.
pub fn compute_cone_values<G, M>(
    graph: &G,
    model: &M,
    scratch: &mut TravScratch,
    root: AigRef,
) -> CexResult<usize>
where
    G: CexGraph + ?Sized,
    M: SatModel + ?Sized,
{
    scratch.ensure_nodes(graph.node_count());
    scratch.increment_trav_id();
    let mut input_count = 0;
    for node in scratch.cone_postorder(graph, root)? {
        let value = match graph.node_kind(node) {
            NodeKind::Input => {
                input_count += 1;
                model.input_value(node)
            }
            _ => {
                let [f0, f1] = graph.fanins(node).ok_or_else(|| {
                    CexError::precondition(format!("AND node %{} has no fan-ins", node.id))
                })?;
                operand_value(scratch, f0) && operand_value(scratch, f1)
            }
        };
        scratch.set_mark1(node, value);
    }
    Ok(input_count)
}

/// Walks back from `root` over values left by [`compute_cone_values`] and
/// collects a literal for every input needed to force `root`'s value.
pub fn justify_cone<G>(
    graph: &G,
    scratch: &mut TravScratch,
    root: AigRef,
    preference: FaninPreference,
) -> CexResult<Vec<PatLit>>
where
    G: CexGraph + ?Sized,
{
    scratch.ensure_nodes(graph.node_count());
    scratch.increment_trav_id();
    let mut pattern = Vec::new();
    let mut worklist = vec![root];
    while let Some(node) = worklist.pop() {
        if scratch.is_trav_id_current(node) {
            continue;
        }
        scratch.set_trav_id_current(node);
        if let Some(input_index) = graph.input_index(node) {
            pattern.push(PatLit::with_value(input_index, scratch.mark1(node))?);
            continue;
        }
        let [f0, f1] = graph.fanins(node).ok_or_else(|| {
            CexError::precondition(format!(
                "justification reached node %{} which is neither an input nor an AND",
                node.id
            ))
        })?;
        if scratch.mark1(node) {
            worklist.push(f1.node);
            worklist.push(f0.node);
            continue;
        }
        let (preferred, other) = match preference {
            FaninPreference::First => (f0, f1),
            FaninPreference::Second => (f1, f0),
        };
        let controlling = if !operand_value(scratch, preferred) {
            preferred
        } else if !operand_value(scratch, other) {
            other
        } else {
            return Err(CexError::precondition(format!(
                "AND node %{} is zero but neither fan-in is zero",
                node.id
            )));
        };
        worklist.push(controlling.node);
    }
    Ok(pattern)
}

/// Driver of an output whose cone values are loaded in the scratch marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConeEvaluation {
    pub output: usize,
    pub driver: AigOperand,
    pub cone_inputs: usize,
}

/// Evaluates the cone of `output` under `model` and checks that the output
/// comes out as one.
pub fn evaluate_output<G, M>(
    graph: &G,
    model: &M,
    scratch: &mut TravScratch,
    output: usize,
) -> CexResult<ConeEvaluation>
where
    G: CexGraph + ?Sized,
    M: SatModel + ?Sized,
{
    let driver = graph.output_driver(output).ok_or_else(|| {
        CexError::precondition(format!(
            "output {} does not exist ({} outputs)",
            output,
            graph.output_count()
        ))
    })?;
    let cone_inputs = compute_cone_values(graph, model, scratch, driver.node)?;
    if !operand_value(scratch, driver) {
        return Err(CexError::precondition(format!(
            "model does not drive output {} to one",
            output
        )));
    }
    Ok(ConeEvaluation {
        output,
        driver,
        cone_inputs,
    })
}

/// Runs both justification walks over the values left by
/// [`evaluate_output`] and keeps the smaller pattern. When both walks
/// produce equally many literals, the second-fan-in walk wins.
pub fn shrink_pattern<G>(
    graph: &G,
    scratch: &mut TravScratch,
    evaluation: &ConeEvaluation,
) -> CexResult<Extraction>
where
    G: CexGraph + ?Sized,
{
    let root = evaluation.driver.node;
    let first = justify_cone(graph, scratch, root, FaninPreference::First)?;
    let second = justify_cone(graph, scratch, root, FaninPreference::Second)?;
    log::trace!(
        "shrink_pattern: output {} cone inputs {} first {} second {}",
        evaluation.output,
        evaluation.cone_inputs,
        first.len(),
        second.len()
    );
    let (first_len, second_len) = (first.len(), second.len());
    let pattern = if first_len < second_len { first } else { second };
    Ok(Extraction {
        pattern,
        cone_inputs: evaluation.cone_inputs,
        first_len,
        second_len,
    })
}

/// Computes a justifying pattern for `output`, which `model` must drive to
/// one.
pub fn extract_pattern<G, M>(
    graph: &G,
    model: &M,
    scratch: &mut TravScratch,
    output: usize,
) -> CexResult<Extraction>
where
    G: CexGraph + ?Sized,
    M: SatModel + ?Sized,
{
    let evaluation = evaluate_output(graph, model, scratch, output)?;
    shrink_pattern(graph, scratch, &evaluation)
}
