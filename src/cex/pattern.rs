// SPDX-License-Identifier: Apache-2.0

//! Literals over primary inputs and the patterns built from them.

use serde::{Deserialize, Serialize};

use crate::cex::error::{CexError, CexResult};

/// A primary input literal encoded as `2 * input_index + compl`.
///
/// `compl` set means the input must be zero for the pattern to hold; clear
/// means it must be one.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatLit(u32);

impl PatLit {
    pub const MAX_INPUT_INDEX: usize = (u32::MAX >> 1) as usize;

    pub fn new(input_index: usize, compl: bool) -> CexResult<Self> {
        if input_index > Self::MAX_INPUT_INDEX {
            return Err(CexError::precondition(format!(
                "input index {} does not fit a pattern literal",
                input_index
            )));
        }
        Ok(PatLit(((input_index as u32) << 1) | compl as u32))
    }

    /// Literal requiring input `input_index` to take `value`.
    pub fn with_value(input_index: usize, value: bool) -> CexResult<Self> {
        Self::new(input_index, !value)
    }

    pub fn from_raw(raw: u32) -> Self {
        PatLit(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn input_index(self) -> usize {
        (self.0 >> 1) as usize
    }

    pub fn is_compl(self) -> bool {
        self.0 & 1 == 1
    }

    /// The value the input must take.
    pub fn required_value(self) -> bool {
        !self.is_compl()
    }
}

/// Checks that `pattern` is non-empty, strictly ascending by raw value, and
/// names each input at most once.
pub fn check_pattern_sorted(pattern: &[PatLit]) -> CexResult<()> {
    if pattern.is_empty() {
        return Err(CexError::precondition("pattern must not be empty"));
    }
    for (i, pair) in pattern.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(CexError::precondition(format!(
                "pattern is not strictly increasing at position {}: {} then {}",
                i + 1,
                pair[0].raw(),
                pair[1].raw()
            )));
        }
        if pair[0].input_index() == pair[1].input_index() {
            return Err(CexError::precondition(format!(
                "pattern requires input {} to be both zero and one",
                pair[0].input_index()
            )));
        }
    }
    Ok(())
}
