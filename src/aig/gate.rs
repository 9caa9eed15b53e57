// SPDX-License-Identifier: Apache-2.0

use bitvec::vec::BitVec;

use crate::aig::topo::topo_sort_refs;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct AigRef {
    pub id: usize,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct AigOperand {
    pub node: AigRef,
    pub negated: bool,
}

impl AigOperand {
    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }

    pub fn non_negated(&self) -> Option<AigRef> {
        if self.negated { None } else { Some(self.node) }
    }
}

impl From<AigRef> for AigOperand {
    fn from(node: AigRef) -> Self {
        AigOperand {
            node,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AigNode {
    Input {
        name: String,
        /// Index where 0 is the least significant bit of the input.
        lsb_index: usize,
    },
    Literal(bool),
    And2 {
        a: AigOperand,
        b: AigOperand,
    },
}

#[derive(Debug, Clone)]
pub struct AigBitVector {
    /// In this representation index 0 is the LSb, the last index is the MSb.
    operands: Vec<AigOperand>,
}

impl From<AigOperand> for AigBitVector {
    fn from(operand: AigOperand) -> Self {
        AigBitVector {
            operands: vec![operand],
        }
    }
}

impl AigBitVector {
    /// Creates a bit vector from a slice where index 0 of the slice is the
    /// least significant bit.
    pub fn from_lsb_is_index_0(operands: &[AigOperand]) -> Self {
        Self {
            operands: operands.to_vec(),
        }
    }

    pub fn iter_lsb_to_msb(&self) -> impl DoubleEndedIterator<Item = &AigOperand> {
        self.operands.iter()
    }

    pub fn get_lsb(&self, index: usize) -> &AigOperand {
        assert!(
            index < self.operands.len(),
            "index {} is out of bounds for bit vector of length {}",
            index,
            self.operands.len()
        );
        &self.operands[index]
    }

    pub fn get_bit_count(&self) -> usize {
        self.operands.len()
    }
}

/// An input has a name (which should be unique among inputs/outputs) and a
/// vector of gate references that make up this named entity; i.e. we have bit
/// vectors for named inputs.
#[derive(Debug, Clone)]
pub struct Input {
    pub name: String,
    pub bit_vector: AigBitVector,
}

/// Similar to inputs, but references from the AIG can be negated.
#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub bit_vector: AigBitVector,
}

#[derive(Debug, Clone)]
pub struct GateFn {
    pub name: String,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub gates: Vec<AigNode>,
}

impl GateFn {
    pub fn get(&self, aig_ref: AigRef) -> &AigNode {
        &self.gates[aig_ref.id]
    }

    /// Input bits flattened in declaration order, each input LSb to MSb.
    pub fn flat_input_refs(&self) -> Vec<AigRef> {
        self.inputs
            .iter()
            .flat_map(|input| input.bit_vector.iter_lsb_to_msb())
            .map(|op| {
                op.non_negated()
                    .expect("primary input bits are never negated")
            })
            .collect()
    }

    /// Output bits flattened in declaration order, each output LSb to MSb.
    pub fn flat_output_operands(&self) -> Vec<AigOperand> {
        self.outputs
            .iter()
            .flat_map(|output| output.bit_vector.iter_lsb_to_msb())
            .copied()
            .collect()
    }

    pub fn post_order_refs(&self) -> Vec<AigRef> {
        topo_sort_refs(&self.gates)
    }

    /// Evaluates every flattened output bit for one concrete assignment of the
    /// flattened input bits.
    pub fn eval_flat(&self, input_bits: &BitVec) -> BitVec {
        let input_refs = self.flat_input_refs();
        assert_eq!(
            input_bits.len(),
            input_refs.len(),
            "eval_flat: expected {} input bits",
            input_refs.len()
        );
        let mut env: BitVec = BitVec::repeat(false, self.gates.len());
        for (input_ref, bit) in input_refs.iter().zip(input_bits.iter()) {
            env.set(input_ref.id, *bit);
        }
        for aig_ref in self.post_order_refs() {
            let value = match self.get(aig_ref) {
                AigNode::Input { .. } => continue,
                AigNode::Literal(value) => *value,
                AigNode::And2 { a, b } => {
                    (env[a.node.id] ^ a.negated) && (env[b.node.id] ^ b.negated)
                }
            };
            env.set(aig_ref.id, value);
        }
        self.flat_output_operands()
            .iter()
            .map(|op| env[op.node.id] ^ op.negated)
            .collect()
    }

    /// Checks internal invariants of the GateFn, panicking if any are violated.
    /// - All AigRef indices in inputs, outputs, and gates must be in-bounds for
    ///   self.gates.
    pub fn check_invariants_with_debug_assert(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let gate_count = self.gates.len();
        for bit in self.inputs.iter().flat_map(|i| i.bit_vector.iter_lsb_to_msb()) {
            assert!(
                bit.node.id < gate_count,
                "Input AigRef out of bounds: {:?} (gates.len() = {})",
                bit.node,
                gate_count
            );
        }
        for bit in self.flat_output_operands() {
            assert!(
                bit.node.id < gate_count,
                "Output AigRef out of bounds: {:?} (gates.len() = {})",
                bit.node,
                gate_count
            );
        }
        for (i, node) in self.gates.iter().enumerate() {
            if let AigNode::And2 { a, b } = node {
                assert!(
                    a.node.id < i && b.node.id < i,
                    "Gate %{}: operands must precede the gate: {:?}, {:?}",
                    i,
                    a.node,
                    b.node
                );
            }
        }
    }
}
