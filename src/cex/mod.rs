// SPDX-License-Identifier: Apache-2.0

pub mod codec;
pub mod error;
pub mod extract;
pub mod graph;
pub mod manager;
pub mod pack;
pub mod pattern;
pub mod scratch;
pub mod sim;
pub mod ternary;

pub use crate::cex::codec::PatternStore;
pub use crate::cex::error::{CexError, CexResult};
pub use crate::cex::graph::{CexGraph, GateFnGraph, NodeKind, SatModel};
pub use crate::cex::manager::{CexPatManager, CexPatOptions, CexPatStats};
pub use crate::cex::pack::{PackOptions, PackStats, PackedPatterns, SimMatrix};
pub use crate::cex::pattern::PatLit;
pub use crate::cex::ternary::TernaryValue;
