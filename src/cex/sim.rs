// SPDX-License-Identifier: Apache-2.0

//! Word-parallel evaluation of a `GateFn` over packed simulation vectors.
//!
//! Every operand value is a row of 32-bit words, one bit per sample, laid out
//! the same way as a `SimMatrix` row: sample `k` is bit `k % 32` of word
//! `k / 32`.

use crate::aig::gate::{AigNode, AigOperand, GateFn};
use crate::cex::error::{CexError, CexResult};
use crate::cex::pack::SimMatrix;

fn apply_neg(words: &[u32], negated: bool) -> impl Iterator<Item = u32> + '_ {
    words.iter().map(move |w| if negated { !w } else { *w })
}

/// Evaluates every flattened output bit of `gate_fn` on all samples of
/// `inputs`, whose rows must follow `gate_fn`'s flattened input order.
pub fn simulate_outputs(gate_fn: &GateFn, inputs: &SimMatrix) -> CexResult<Vec<Vec<u32>>> {
    let input_refs = gate_fn.flat_input_refs();
    if input_refs.len() != inputs.input_count() {
        return Err(CexError::precondition(format!(
            "simulation matrix has {} rows but `{}` has {} input bits",
            inputs.input_count(),
            gate_fn.name,
            input_refs.len()
        )));
    }
    let words = inputs.words();
    let mut env: Vec<Vec<u32>> = vec![Vec::new(); gate_fn.gates.len()];
    for (index, input_ref) in input_refs.iter().enumerate() {
        env[input_ref.id] = inputs.row_words(index).to_vec();
    }

    for aig_ref in gate_fn.post_order_refs() {
        match gate_fn.get(aig_ref) {
            AigNode::Input { .. } => {
                // Already seeded above.
            }
            AigNode::Literal(value) => {
                env[aig_ref.id] = vec![if *value { u32::MAX } else { 0 }; words];
            }
            AigNode::And2 { a, b } => {
                let value: Vec<u32> = apply_neg(&env[a.node.id], a.negated)
                    .zip(apply_neg(&env[b.node.id], b.negated))
                    .map(|(x, y)| x & y)
                    .collect();
                env[aig_ref.id] = value;
            }
        }
    }

    let outputs: Vec<Vec<u32>> = gate_fn
        .flat_output_operands()
        .into_iter()
        .map(|operand: AigOperand| apply_neg(&env[operand.node.id], operand.negated).collect())
        .collect();
    log::trace!(
        "simulate_outputs: `{}` {} outputs x {} words",
        gate_fn.name,
        outputs.len(),
        words
    );
    Ok(outputs)
}

/// Bit `column` of a simulated row.
pub fn sample(words: &[u32], column: usize) -> bool {
    (words[column / 32] >> (column % 32)) & 1 == 1
}
