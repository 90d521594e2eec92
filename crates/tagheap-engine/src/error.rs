//! Engine error types.

use std::error::Error;
use std::fmt;

use tagheap_arena::ArenaError;

/// Errors raised while constructing an [`Engine`](crate::Engine).
///
/// Allocation failures are not errors; they surface as `None` from
/// [`Engine::allocate`](crate::Engine::allocate) and friends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The arena provider refused to initialise or grow.
    Arena(ArenaError),
    /// The engine configuration failed validation.
    InvalidConfig {
        /// Human-readable explanation.
        reason: String,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "arena error: {e}"),
            Self::InvalidConfig { reason } => write!(f, "invalid engine config: {reason}"),
        }
    }
}

impl Error for HeapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::InvalidConfig { .. } => None,
        }
    }
}

impl From<ArenaError> for HeapError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
