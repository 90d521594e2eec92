//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for an [`ArenaRegion`](crate::ArenaRegion).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Fixed ceiling of the arena in bytes.
    ///
    /// Default: 4 MiB. Must be nonzero and a multiple of
    /// [`ArenaConfig::GRANULE`].
    pub reserved_bytes: usize,
}

impl ArenaConfig {
    /// Default reserved ceiling: 4 MiB.
    pub const DEFAULT_RESERVED_BYTES: usize = 4 * (1 << 20);

    /// Granule the ceiling must be a multiple of.
    pub const GRANULE: usize = 16;

    /// Create a config with the given ceiling.
    pub fn new(reserved_bytes: usize) -> Self {
        Self { reserved_bytes }
    }

    /// Check the structural constraints on this config.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.reserved_bytes == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "reserved_bytes must be nonzero".to_string(),
            });
        }
        if self.reserved_bytes % Self::GRANULE != 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "reserved_bytes must be a multiple of {} (got {})",
                    Self::GRANULE,
                    self.reserved_bytes,
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RESERVED_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceiling_is_4mb() {
        assert_eq!(ArenaConfig::default().reserved_bytes, 4 * 1024 * 1024);
        assert!(ArenaConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_ceiling_rejected() {
        let err = ArenaConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, ArenaError::InvalidConfig { .. }));
    }

    #[test]
    fn unaligned_ceiling_rejected() {
        let err = ArenaConfig::new(1000).validate().unwrap_err();
        assert!(err.to_string().contains("multiple of 16"));
    }
}
