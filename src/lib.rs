// SPDX-License-Identifier: Apache-2.0

//! Counterexample handling for AIG equivalence sweeping: shrink SAT models to
//! small justifying input patterns, certify them by ternary simulation, keep
//! them in a compact byte store, and pack them into word-parallel simulation
//! vectors.

pub mod aig;
pub mod cex;
pub mod sat_varisat;
