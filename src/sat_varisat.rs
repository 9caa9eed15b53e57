// SPDX-License-Identifier: Apache-2.0

//! Finds input assignments that drive a single output of a `GateFn` to one.
//!
//! Only the fan-in cone of the queried output is encoded; inputs outside the
//! cone read as zero in the returned model. We use varisat because the
//! query is posed as an assumption on top of plain Tseitin clauses.

use std::collections::{HashMap, HashSet};

use bitvec::vec::BitVec;
use varisat::ExtendFormula;

use crate::aig::gate::{AigNode, AigRef, GateFn};
use crate::aig::topo::extract_cone;
use crate::cex::graph::SatModel;

#[derive(Debug)]
pub enum SatError {
    NoSuchOutput { output: usize, output_count: usize },
    MissingModel,
    SolverError(varisat::solver::SolverError),
}

impl std::fmt::Display for SatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SatError::NoSuchOutput {
                output,
                output_count,
            } => write!(
                f,
                "output {} does not exist ({} output bits)",
                output, output_count
            ),
            SatError::MissingModel => write!(f, "solver reported SAT without a model"),
            SatError::SolverError(e) => write!(f, "solver error: {:?}", e),
        }
    }
}

impl std::error::Error for SatError {}

impl From<varisat::solver::SolverError> for SatError {
    fn from(e: varisat::solver::SolverError) -> Self {
        SatError::SolverError(e)
    }
}

/// Values of the primary inputs in a satisfying assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarisatModel {
    values: HashMap<AigRef, bool>,
}

impl VarisatModel {
    /// Input values flattened in `gate_fn`'s input order.
    pub fn flat_input_bits(&self, gate_fn: &GateFn) -> BitVec {
        gate_fn
            .flat_input_refs()
            .iter()
            .map(|r| self.input_value(*r))
            .collect()
    }
}

impl SatModel for VarisatModel {
    fn input_value(&self, node: AigRef) -> bool {
        self.values.get(&node).copied().unwrap_or(false)
    }
}

// Tseitin clauses for output <=> a AND b:
// (output | !a | !b) & (!output | a) & (!output | b)
fn add_tseitsin_and(
    solver: &mut impl ExtendFormula,
    a: varisat::Lit,
    b: varisat::Lit,
    output: varisat::Lit,
) {
    solver.add_clause(&[!a, !b, output]);
    solver.add_clause(&[a, !output]);
    solver.add_clause(&[b, !output]);
}

fn build_cone_clauses(
    solver: &mut impl ExtendFormula,
    cone_gates: &[AigRef],
    cone_inputs: &HashSet<AigRef>,
    gates: &[AigNode],
) -> HashMap<AigRef, varisat::Lit> {
    let mut aig_ref_to_lit: HashMap<AigRef, varisat::Lit> = HashMap::new();
    for aig_ref in cone_gates.iter().chain(cone_inputs.iter()) {
        aig_ref_to_lit.insert(*aig_ref, solver.new_lit());
    }
    for aig_ref in cone_gates {
        let output_lit = aig_ref_to_lit[aig_ref];
        match &gates[aig_ref.id] {
            AigNode::Literal(value) => {
                if *value {
                    solver.add_clause(&[output_lit]);
                } else {
                    solver.add_clause(&[!output_lit]);
                }
            }
            AigNode::And2 { a, b } => {
                let a_lit = aig_ref_to_lit[&a.node];
                let b_lit = aig_ref_to_lit[&b.node];
                let a_lit = if a.negated { !a_lit } else { a_lit };
                let b_lit = if b.negated { !b_lit } else { b_lit };
                add_tseitsin_and(solver, a_lit, b_lit, output_lit);
            }
            AigNode::Input { .. } => {}
        }
    }
    aig_ref_to_lit
}

/// Holds the SAT solver used for output queries.
pub struct OutputSolver<'a> {
    solver: varisat::Solver<'a>,
}

impl Default for OutputSolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> OutputSolver<'a> {
    pub fn new() -> Self {
        Self {
            solver: varisat::Solver::new(),
        }
    }

    /// Returns a model under which flattened output bit `output` of `gate_fn`
    /// is one, or `None` if the output is constant zero.
    ///
    /// Each query starts from an empty formula.
    pub fn find_output_model(
        &mut self,
        gate_fn: &GateFn,
        output: usize,
    ) -> Result<Option<VarisatModel>, SatError> {
        let outputs = gate_fn.flat_output_operands();
        let driver = *outputs.get(output).ok_or(SatError::NoSuchOutput {
            output,
            output_count: outputs.len(),
        })?;
        self.solver = varisat::Solver::new();
        let (cone_gates, cone_inputs) = extract_cone(&[driver.node], &gate_fn.gates);
        let aig_ref_to_lit =
            build_cone_clauses(&mut self.solver, &cone_gates, &cone_inputs, &gate_fn.gates);
        let driver_lit = aig_ref_to_lit[&driver.node];
        let output_lit = if driver.negated {
            !driver_lit
        } else {
            driver_lit
        };
        self.solver.assume(&[output_lit]);
        if !self.solver.solve()? {
            log::debug!(
                "find_output_model: `{}` output {} is unsatisfiable",
                gate_fn.name,
                output
            );
            return Ok(None);
        }
        let model = self.solver.model().ok_or(SatError::MissingModel)?;
        let model_set: HashSet<varisat::Lit> = model.into_iter().collect();
        let values = cone_inputs
            .iter()
            .map(|input| (*input, model_set.contains(&aig_ref_to_lit[input])))
            .collect();
        log::debug!(
            "find_output_model: `{}` output {} satisfiable over {} cone inputs",
            gate_fn.name,
            output,
            cone_inputs.len()
        );
        Ok(Some(VarisatModel { values }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::gate_builder::{GateBuilder, GateBuilderOptions};

    #[test]
    fn test_model_drives_output_high() {
        let mut gb = GateBuilder::new("xor".to_string(), GateBuilderOptions::opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let b = *gb.add_input("b".to_string(), 1).get_lsb(0);
        let x = gb.add_xor_binary(a, b);
        gb.add_output("o".to_string(), x.into());
        let gate_fn = gb.build();

        let mut solver = OutputSolver::new();
        let model = solver.find_output_model(&gate_fn, 0).unwrap().unwrap();
        let outputs = gate_fn.eval_flat(&model.flat_input_bits(&gate_fn));
        assert!(outputs[0]);
    }

    #[test]
    fn test_contradiction_is_unsat() {
        let mut gb = GateBuilder::new("contra".to_string(), GateBuilderOptions::no_opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        let o = gb.add_and_binary(a, a.negate());
        gb.add_output("o".to_string(), o.into());
        let gate_fn = gb.build();

        let mut solver = OutputSolver::new();
        assert!(solver.find_output_model(&gate_fn, 0).unwrap().is_none());
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let mut gb = GateBuilder::new("one".to_string(), GateBuilderOptions::opt());
        let a = *gb.add_input("a".to_string(), 1).get_lsb(0);
        gb.add_output("o".to_string(), a.into());
        let gate_fn = gb.build();
        let mut solver = OutputSolver::new();
        assert!(matches!(
            solver.find_output_model(&gate_fn, 3),
            Err(SatError::NoSuchOutput {
                output: 3,
                output_count: 1
            })
        ));
    }
}
