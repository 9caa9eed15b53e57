// SPDX-License-Identifier: Apache-2.0

use crate::cex::pattern::PatLit;

/// Failures of the counterexample pipeline.
///
/// None of these are retried: each one means the calling sequence is wrong or
/// the SAT model disagrees with the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CexError {
    PreconditionViolation {
        context: String,
    },
    VerificationFailure {
        output: usize,
        pattern: Vec<PatLit>,
    },
    DecodeUnderrun {
        offset: usize,
        len: usize,
    },
    MalformedStore {
        offset: usize,
        reason: String,
    },
}

impl CexError {
    pub(crate) fn precondition(context: impl Into<String>) -> Self {
        CexError::PreconditionViolation {
            context: context.into(),
        }
    }
}

impl std::fmt::Display for CexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CexError::PreconditionViolation { context } => {
                write!(f, "precondition violated: {}", context)
            }
            CexError::VerificationFailure { output, pattern } => write!(
                f,
                "ternary verification failed for output {} with pattern {:?}",
                output,
                pattern.iter().map(|lit| lit.raw()).collect::<Vec<u32>>()
            ),
            CexError::DecodeUnderrun { offset, len } => write!(
                f,
                "pattern store underrun: read at offset {} of {} bytes",
                offset, len
            ),
            CexError::MalformedStore { offset, reason } => {
                write!(f, "malformed pattern store at offset {}: {}", offset, reason)
            }
        }
    }
}

impl std::error::Error for CexError {}

pub type CexResult<T> = std::result::Result<T, CexError>;
