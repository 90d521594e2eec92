//! The growable byte region and its `sbrk`-style mark.
//!
//! An [`ArenaRegion`] owns a `Vec<u8>` whose length is the current mark
//! (`brk`) and whose capacity is the reserved ceiling. Extension grows the
//! length in place; the buffer is reserved to full capacity at creation so
//! growth never reallocates.

use tracing::{debug, trace};

use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// Size of a machine word in bytes. Word accessors read and write this many.
pub const WORD_SIZE: usize = 8;

/// A contiguous byte arena with a monotonically increasing mark.
///
/// Offsets are relative to the start of the arena (`heap_lo() == 0`).
/// Bytes in `[0, brk)` are readable and writable; anything at or above
/// the mark is out of bounds and panics on access.
#[derive(Debug)]
pub struct ArenaRegion {
    /// Backing storage. `data.len()` is the mark.
    data: Vec<u8>,
    /// Fixed ceiling in bytes.
    reserved: usize,
}

impl ArenaRegion {
    /// Reserve a new, empty arena.
    ///
    /// Returns `Err(ArenaError::InvalidConfig)` if the config fails
    /// validation.
    pub fn new(config: &ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        debug!(reserved = config.reserved_bytes, "arena reserved");
        Ok(Self {
            data: Vec::with_capacity(config.reserved_bytes),
            reserved: config.reserved_bytes,
        })
    }

    /// Move the mark up by `increment` bytes.
    ///
    /// Returns the previous mark, which is the offset of the first newly
    /// granted byte. Fails without changing anything if `increment` is
    /// negative or the new mark would pass the ceiling.
    pub fn extend(&mut self, increment: isize) -> Result<usize, ArenaError> {
        let Ok(increment) = usize::try_from(increment) else {
            return Err(ArenaError::NegativeIncrement { increment });
        };
        let old_brk = self.data.len();
        let remaining = self.remaining();
        if increment > remaining {
            return Err(ArenaError::Exhausted {
                requested: increment,
                remaining,
            });
        }
        self.data.resize(old_brk + increment, 0);
        trace!(old_brk, new_brk = self.data.len(), "arena extended");
        Ok(old_brk)
    }

    /// Tear the arena down, returning the final mark.
    pub fn deinit(self) -> usize {
        let brk = self.data.len();
        debug!(brk, reserved = self.reserved, "arena released");
        brk
    }

    /// Offset of the first byte of the arena. Always zero.
    pub fn heap_lo(&self) -> usize {
        0
    }

    /// Offset of the last formatted byte, or `None` for an empty arena.
    pub fn heap_hi(&self) -> Option<usize> {
        self.data.len().checked_sub(1)
    }

    /// Current mark: number of bytes handed out so far.
    pub fn brk(&self) -> usize {
        self.data.len()
    }

    /// Alias of [`brk`](Self::brk) in memlib terms.
    pub fn heap_size(&self) -> usize {
        self.data.len()
    }

    /// Fixed ceiling in bytes.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes still available below the ceiling.
    pub fn remaining(&self) -> usize {
        self.reserved - self.data.len()
    }

    /// Read the word at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + WORD_SIZE` exceeds the mark.
    pub fn read_word(&self, offset: usize) -> u64 {
        let mut buf = [0u8; WORD_SIZE];
        buf.copy_from_slice(&self.data[offset..offset + WORD_SIZE]);
        u64::from_ne_bytes(buf)
    }

    /// Write `value` as the word at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + WORD_SIZE` exceeds the mark.
    pub fn write_word(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + WORD_SIZE].copy_from_slice(&value.to_ne_bytes());
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the mark.
    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }

    /// Mutably borrow `len` bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the mark.
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.data[offset..offset + len]
    }

    /// Copy `len` bytes from `src` to `dst` within the arena. Ranges may overlap.
    ///
    /// # Panics
    ///
    /// Panics if either range exceeds the mark.
    pub fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        self.data.copy_within(src..src + len, dst);
    }
}
