//! Boundary tags: the packed size/allocation word in every header and footer.

use std::fmt;

/// Decoded contents of a header or footer word.
///
/// # Bit layout
///
/// ```text
///  63                              4   3   2   1   0
/// ┌─────────────────────────────────┬───┬───┬───┬───┐
/// │ size (bytes, multiple of 16)    │ reserved  │ a │
/// └─────────────────────────────────┴───┴───┴───┴───┘
/// ```
///
/// Sizes are always multiples of 16, so the low four bits of the size
/// are zero and are reused for flags. Only bit 0 (`allocated`) is
/// assigned; bits 1–3 are written as zero and ignored on decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockTag {
    size: usize,
    allocated: bool,
}

impl BlockTag {
    /// Bit holding the allocation flag.
    pub const ALLOCATED_BIT: u64 = 0b0001;
    /// Bits reserved for future flags.
    pub const RESERVED_MASK: u64 = 0b1110;
    /// Bits holding the size.
    pub const SIZE_MASK: u64 = !0b1111;

    /// The epilogue tag: size zero, allocated.
    pub const EPILOGUE: Self = Self {
        size: 0,
        allocated: true,
    };

    /// Tag for a free block of `size` bytes.
    pub fn free(size: usize) -> Self {
        debug_assert_eq!(size % 16, 0, "block size {size} not a multiple of 16");
        Self {
            size,
            allocated: false,
        }
    }

    /// Tag for an allocated block of `size` bytes.
    pub fn allocated(size: usize) -> Self {
        debug_assert_eq!(size % 16, 0, "block size {size} not a multiple of 16");
        Self {
            size,
            allocated: true,
        }
    }

    /// Total block size in bytes, tags included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the block is allocated.
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Whether the block is free.
    pub fn is_free(&self) -> bool {
        !self.allocated
    }

    /// Pack into a header/footer word.
    pub fn encode(self) -> u64 {
        (self.size as u64 & Self::SIZE_MASK) | u64::from(self.allocated)
    }

    /// Unpack a header/footer word. Reserved bits are ignored.
    pub fn decode(word: u64) -> Self {
        Self {
            size: (word & Self::SIZE_MASK) as usize,
            allocated: word & Self::ALLOCATED_BIT != 0,
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.allocated { 'a' } else { 'f' };
        write!(f, "[{}:{}]", self.size, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_bit_is_lowest() {
        assert_eq!(BlockTag::allocated(32).encode(), 33);
        assert_eq!(BlockTag::free(32).encode(), 32);
        assert_eq!(BlockTag::EPILOGUE.encode(), 1);
    }

    #[test]
    fn decode_inverts_encode() {
        let tag = BlockTag::allocated(4096);
        assert_eq!(BlockTag::decode(tag.encode()), tag);
    }

    #[test]
    fn reserved_bits_ignored_on_decode() {
        let tag = BlockTag::decode(64 | BlockTag::RESERVED_MASK);
        assert_eq!(tag, BlockTag::free(64));
    }

    #[test]
    fn display_matches_dump_format() {
        assert_eq!(BlockTag::allocated(48).to_string(), "[48:a]");
        assert_eq!(BlockTag::free(4048).to_string(), "[4048:f]");
    }
}
