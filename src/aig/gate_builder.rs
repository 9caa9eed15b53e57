// SPDX-License-Identifier: Apache-2.0

//! The `GateBuilder` is a builder for a `GateFn` -- it builds up the underlying
//! (AIG) data structure as operations are added.
//!
//! It can be created with "folding" (opportunistic simplification) and
//! structural hashing on or off -- "off" is useful for building graphs with
//! redundant structure on purpose, e.g. miters whose two halves are
//! structurally identical.
//!
//! Basic example usage:
//! ```
//! use xlsynth_cex::aig::{AigBitVector, AigOperand, GateBuilder, GateBuilderOptions, GateFn};
//!
//! let mut builder = GateBuilder::new("my_and_gate".to_string(), GateBuilderOptions::opt());
//! let a: AigBitVector = builder.add_input("a".to_string(), 1);
//! let a0: &AigOperand = a.get_lsb(0);
//! let b: AigBitVector = builder.add_input("b".to_string(), 1);
//! let b0: &AigOperand = b.get_lsb(0);
//! let o0: AigOperand = builder.add_and_binary(*a0, *b0);
//! builder.add_output("o".to_string(), o0.into());
//! let gate_fn: GateFn = builder.build();
//! assert_eq!(gate_fn.gates.len(), 4);
//! ```

use std::collections::HashMap;

use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn, Input, Output};

#[derive(Debug, Clone, Copy)]
pub struct GateBuilderOptions {
    pub fold: bool,
    pub hash: bool,
}

impl GateBuilderOptions {
    /// Returns a default "optimizing" `GateBuilderOptions` with folding and
    /// hashing enabled.
    pub fn opt() -> Self {
        Self {
            fold: true,
            hash: true,
        }
    }

    pub fn no_opt() -> Self {
        Self {
            fold: false,
            hash: false,
        }
    }
}

pub struct GateBuilder {
    pub name: String,
    pub gates: Vec<AigNode>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub options: GateBuilderOptions,
    /// Structural hash table keyed on the (ordered) operand pair.
    strash: HashMap<(AigOperand, AigOperand), AigRef>,
}

fn operand_key(operand: &AigOperand) -> (usize, bool) {
    (operand.node.id, operand.negated)
}

impl GateBuilder {
    pub fn new(name: String, options: GateBuilderOptions) -> Self {
        Self {
            name,
            gates: vec![AigNode::Literal(false)],
            inputs: Vec::new(),
            outputs: Vec::new(),
            options,
            strash: HashMap::new(),
        }
    }

    pub fn build(self) -> GateFn {
        debug_assert!(
            !self.outputs.is_empty(),
            "GateBuilder::build: graph must have at least one output (degenerate/empty graph)"
        );
        GateFn {
            name: self.name,
            inputs: self.inputs,
            outputs: self.outputs,
            gates: self.gates,
        }
    }

    pub fn get_false(&self) -> AigOperand {
        AigOperand {
            node: AigRef { id: 0 },
            negated: false,
        }
    }

    pub fn is_known_false(&self, operand: AigOperand) -> bool {
        operand.node.id == 0 && !operand.negated
    }

    pub fn get_true(&self) -> AigOperand {
        AigOperand {
            node: AigRef { id: 0 },
            negated: true,
        }
    }

    pub fn is_known_true(&self, operand: AigOperand) -> bool {
        operand.node.id == 0 && operand.negated
    }

    pub fn add_input(&mut self, name: String, bit_count: usize) -> AigBitVector {
        let mut bits: Vec<AigOperand> = Vec::new();
        for lsb_i in 0..bit_count {
            let gate_ref = AigRef {
                id: self.gates.len(),
            };
            self.gates.push(AigNode::Input {
                name: name.clone(),
                lsb_index: lsb_i,
            });
            bits.push(gate_ref.into());
        }
        let bit_vector = AigBitVector::from_lsb_is_index_0(&bits);
        self.inputs.push(Input {
            name,
            bit_vector: bit_vector.clone(),
        });
        bit_vector
    }

    pub fn add_output(&mut self, name: String, bit_vector: AigBitVector) {
        for bit in bit_vector.iter_lsb_to_msb() {
            debug_assert!(
                bit.node.id < self.gates.len(),
                "add_output: Output node index out of bounds: {} (gates.len() = {})",
                bit.node.id,
                self.gates.len()
            );
        }
        self.outputs.push(Output { name, bit_vector });
    }

    pub fn add_and_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        if self.options.fold {
            // If either side is known false, the result is false.
            if self.is_known_false(lhs) || self.is_known_false(rhs) {
                return self.get_false();
            }
            // If one side is known true, the result is the other side.
            if self.is_known_true(lhs) {
                return rhs;
            }
            if self.is_known_true(rhs) {
                return lhs;
            }
            if lhs == rhs {
                return lhs;
            }
            if lhs == rhs.negate() {
                return self.get_false();
            }
        }
        let (a, b) = if operand_key(&lhs) <= operand_key(&rhs) {
            (lhs, rhs)
        } else {
            (rhs, lhs)
        };
        if self.options.hash {
            if let Some(existing) = self.strash.get(&(a, b)) {
                return (*existing).into();
            }
        }
        let gate_ref = AigRef {
            id: self.gates.len(),
        };
        self.gates.push(AigNode::And2 { a, b });
        if self.options.hash {
            self.strash.insert((a, b), gate_ref);
        }
        gate_ref.into()
    }

    pub fn add_not(&mut self, arg: AigOperand) -> AigOperand {
        arg.negate()
    }

    pub fn add_or_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        if self.options.fold {
            if self.is_known_true(lhs) || self.is_known_true(rhs) {
                return self.get_true();
            }
            if self.is_known_false(lhs) {
                return rhs;
            }
            if self.is_known_false(rhs) {
                return lhs;
            }
        }
        let not_lhs = self.add_not(lhs);
        let not_rhs = self.add_not(rhs);
        let and = self.add_and_binary(not_lhs, not_rhs);
        self.add_not(and)
    }

    pub fn add_xor_binary(&mut self, lhs: AigOperand, rhs: AigOperand) -> AigOperand {
        if self.options.fold {
            if self.is_known_false(lhs) {
                return rhs;
            }
            if self.is_known_false(rhs) {
                return lhs;
            }
            if self.is_known_true(lhs) {
                return self.add_not(rhs);
            }
            if self.is_known_true(rhs) {
                return self.add_not(lhs);
            }
        }
        // the formula for xor is (~a & b) | (a & ~b)
        let not_lhs = self.add_not(lhs);
        let not_rhs = self.add_not(rhs);
        let lhs_only = self.add_and_binary(lhs, not_rhs);
        let rhs_only = self.add_and_binary(not_lhs, rhs);
        self.add_or_binary(lhs_only, rhs_only)
    }

    /// Ands together all of `args`, left to right.
    pub fn add_and_nary(&mut self, args: &[AigOperand]) -> AigOperand {
        let mut result = self.get_true();
        for arg in args {
            result = if self.is_known_true(result) && !self.options.fold {
                *arg
            } else {
                self.add_and_binary(result, *arg)
            };
        }
        result
    }

    /// Ors together all of `args`, left to right.
    pub fn add_or_nary(&mut self, args: &[AigOperand]) -> AigOperand {
        let negated: Vec<AigOperand> = args.iter().map(|arg| arg.negate()).collect();
        let and = self.add_and_nary(&negated);
        self.add_not(and)
    }

    /// Returns a miter bit that is one iff `lhs` and `rhs` differ in some bit
    /// position.
    pub fn add_miter(&mut self, lhs: &AigBitVector, rhs: &AigBitVector) -> AigOperand {
        assert_eq!(
            lhs.get_bit_count(),
            rhs.get_bit_count(),
            "add_miter: bit count mismatch"
        );
        let diffs: Vec<AigOperand> = lhs
            .iter_lsb_to_msb()
            .zip(rhs.iter_lsb_to_msb())
            .map(|(l, r)| self.add_xor_binary(*l, *r))
            .collect();
        self.add_or_nary(&diffs)
    }
}
