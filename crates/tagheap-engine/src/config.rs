//! Engine configuration.

use tagheap_arena::ArenaConfig;

use crate::check::CheckMode;
use crate::error::HeapError;
use crate::layout::{ALIGNMENT, MIN_BLOCK_SIZE};

/// Configuration for an [`Engine`](crate::Engine).
///
/// Validated by [`Engine::init`](crate::Engine::init).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Arena ceiling and related settings.
    pub arena: ArenaConfig,

    /// Minimum number of bytes to grow the arena by when no free block fits.
    ///
    /// Default: 4096. Must be a multiple of 16 and at least 32.
    /// `init` also grows the fresh heap by this amount.
    pub chunk_size: usize,

    /// What `check_heap` does when it finds a violation.
    ///
    /// Default: [`CheckMode::Lenient`].
    pub check_mode: CheckMode,
}

impl EngineConfig {
    /// Default growth chunk.
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    /// Environment variable overriding the arena ceiling.
    pub const ENV_ARENA_BYTES: &'static str = "TAGHEAP_ARENA_BYTES";
    /// Environment variable overriding the chunk size.
    pub const ENV_CHUNK_SIZE: &'static str = "TAGHEAP_CHUNK_SIZE";
    /// Environment variable selecting strict checking (`1` or `true`).
    pub const ENV_STRICT: &'static str = "TAGHEAP_STRICT";

    /// Config with the given arena ceiling and defaults elsewhere.
    pub fn new(reserved_bytes: usize) -> Self {
        Self {
            arena: ArenaConfig::new(reserved_bytes),
            ..Self::default()
        }
    }

    /// Defaults, overridden by `TAGHEAP_*` environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(bytes) = env_usize(Self::ENV_ARENA_BYTES) {
            config.arena.reserved_bytes = bytes;
        }
        if let Some(chunk) = env_usize(Self::ENV_CHUNK_SIZE) {
            config.chunk_size = chunk;
        }
        if let Ok(val) = std::env::var(Self::ENV_STRICT) {
            if val == "1" || val.eq_ignore_ascii_case("true") {
                config.check_mode = CheckMode::Strict;
            }
        }

        config
    }

    /// Replace the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Replace the check mode.
    pub fn with_check_mode(mut self, check_mode: CheckMode) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Check the structural constraints on this config.
    pub fn validate(&self) -> Result<(), HeapError> {
        self.arena.validate()?;
        if self.chunk_size < MIN_BLOCK_SIZE || self.chunk_size % ALIGNMENT != 0 {
            return Err(HeapError::InvalidConfig {
                reason: format!(
                    "chunk_size must be a multiple of {ALIGNMENT} and >= {MIN_BLOCK_SIZE} (got {})",
                    self.chunk_size,
                ),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arena: ArenaConfig::default(),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            check_mode: CheckMode::Lenient,
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.trim().parse().ok()
}
