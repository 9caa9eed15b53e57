// SPDX-License-Identifier: Apache-2.0

pub mod gate;
pub mod gate_builder;
pub mod topo;

pub use crate::aig::gate::{AigBitVector, AigNode, AigOperand, AigRef, GateFn, Input, Output};
pub use crate::aig::gate_builder::{GateBuilder, GateBuilderOptions};
