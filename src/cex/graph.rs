// SPDX-License-Identifier: Apache-2.0

//! The narrow view of the graph and of the SAT model that the counterexample
//! engine relies on.
//!
//! Nodes are addressed by `AigRef` (a dense index, so per-node scratch state
//! can live in flat arrays). Primary inputs additionally carry a small stable
//! "input index" which is what pattern literals refer to.

use crate::aig::gate::{AigNode, AigOperand, AigRef, GateFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Input,
    And,
    Constant,
}

pub trait CexGraph {
    /// Upper bound (exclusive) on `AigRef::id` for every node in the graph.
    fn node_count(&self) -> usize;

    fn node_kind(&self, node: AigRef) -> NodeKind;

    /// Ordered fan-ins (with complement flags) of an AND node; `None` for any
    /// other node kind.
    fn fanins(&self, node: AigRef) -> Option<[AigOperand; 2]>;

    fn input_count(&self) -> usize;

    /// Input index of an input node; `None` if `node` is not a primary input.
    fn input_index(&self, node: AigRef) -> Option<usize>;

    fn input_node(&self, index: usize) -> Option<AigRef>;

    fn output_count(&self) -> usize;

    /// The fan-in edge (node plus complement) driving output `output`.
    fn output_driver(&self, output: usize) -> Option<AigOperand>;
}

/// Read access to the assignment a SAT solver produced.
pub trait SatModel {
    fn input_value(&self, node: AigRef) -> bool;
}

impl<F> SatModel for F
where
    F: Fn(AigRef) -> bool,
{
    fn input_value(&self, node: AigRef) -> bool {
        self(node)
    }
}

/// `CexGraph` over a `GateFn`, with inputs and outputs flattened to single
/// bits (each bundle LSb to MSb, bundles in declaration order).
pub struct GateFnGraph<'a> {
    gate_fn: &'a GateFn,
    inputs: Vec<AigRef>,
    node_to_input: Vec<Option<usize>>,
    outputs: Vec<AigOperand>,
}

impl<'a> GateFnGraph<'a> {
    pub fn new(gate_fn: &'a GateFn) -> Self {
        gate_fn.check_invariants_with_debug_assert();
        let inputs = gate_fn.flat_input_refs();
        let mut node_to_input = vec![None; gate_fn.gates.len()];
        for (index, input_ref) in inputs.iter().enumerate() {
            node_to_input[input_ref.id] = Some(index);
        }
        Self {
            gate_fn,
            inputs,
            node_to_input,
            outputs: gate_fn.flat_output_operands(),
        }
    }
}

impl CexGraph for GateFnGraph<'_> {
    fn node_count(&self) -> usize {
        self.gate_fn.gates.len()
    }

    fn node_kind(&self, node: AigRef) -> NodeKind {
        match self.gate_fn.get(node) {
            AigNode::Input { .. } => NodeKind::Input,
            AigNode::And2 { .. } => NodeKind::And,
            AigNode::Literal(_) => NodeKind::Constant,
        }
    }

    fn fanins(&self, node: AigRef) -> Option<[AigOperand; 2]> {
        match self.gate_fn.get(node) {
            AigNode::And2 { a, b } => Some([*a, *b]),
            _ => None,
        }
    }

    fn input_count(&self) -> usize {
        self.inputs.len()
    }

    fn input_index(&self, node: AigRef) -> Option<usize> {
        self.node_to_input.get(node.id).copied().flatten()
    }

    fn input_node(&self, index: usize) -> Option<AigRef> {
        self.inputs.get(index).copied()
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output_driver(&self, output: usize) -> Option<AigOperand> {
        self.outputs.get(output).copied()
    }
}
