//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// `extend` was called with a negative increment. The arena never shrinks.
    NegativeIncrement {
        /// The rejected increment.
        increment: isize,
    },
    /// The extension would push the mark past the reserved ceiling.
    Exhausted {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes still available below the ceiling.
        remaining: usize,
    },
    /// The arena configuration failed validation.
    InvalidConfig {
        /// Human-readable explanation.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeIncrement { increment } => {
                write!(f, "arena cannot shrink: increment {increment}")
            }
            Self::Exhausted {
                requested,
                remaining,
            } => {
                write!(
                    f,
                    "arena exhausted: requested {requested} bytes, {remaining} bytes remaining"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
