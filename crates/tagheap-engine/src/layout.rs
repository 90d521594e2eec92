//! Heap geometry: word and block sizes, sentinel placement, size rounding.
//!
//! ```text
//! offset 0   padding word
//! offset 8   prologue header  [32 | a]
//! offset 16  prologue payload (free-list sentinel links)
//! offset 32  prologue footer  [32 | a]
//! offset 40  epilogue header  [0 | a]
//! offset 48  first block payload (after the initial extension)
//! ```

use crate::handle::Payload;

pub use tagheap_arena::WORD_SIZE;

/// Payload alignment and block-size granularity.
pub const ALIGNMENT: usize = 16;

/// Header plus footer.
pub const TAG_OVERHEAD: usize = 2 * WORD_SIZE;

/// Smallest block: header, two link words, footer.
pub const MIN_BLOCK_SIZE: usize = 2 * ALIGNMENT;

/// Size recorded in the prologue's tags.
pub const PROLOGUE_SIZE: usize = MIN_BLOCK_SIZE;

/// Bytes formatted by `init` before the first extension:
/// padding, prologue, epilogue header.
pub const INITIAL_HEAP_SIZE: usize = WORD_SIZE + PROLOGUE_SIZE + WORD_SIZE;

/// Bytes of every heap taken by the padding word and both sentinels.
pub const SENTINEL_OVERHEAD: usize = INITIAL_HEAP_SIZE;

/// Payload offset of the prologue block, which anchors the free list.
pub const PROLOGUE: Payload = Payload::new(2 * WORD_SIZE);

/// Round `n` up to the next multiple of [`ALIGNMENT`].
///
/// Returns `None` on overflow.
pub fn align_up(n: usize) -> Option<usize> {
    Some(n.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1))
}

/// Block size needed to serve a request of `requested` payload bytes.
///
/// Requests of up to one alignment unit get the minimum block. Larger
/// requests are rounded up to the alignment and then pay for the tags.
/// Returns `None` for zero or on overflow.
pub fn adjusted_size(requested: usize) -> Option<usize> {
    match requested {
        0 => None,
        n if n <= ALIGNMENT => Some(MIN_BLOCK_SIZE),
        n => align_up(n)?.checked_add(TAG_OVERHEAD),
    }
}

/// How far to grow the arena when no free block fits `adjusted`.
pub fn extension_size(adjusted: usize, chunk_size: usize) -> Option<usize> {
    align_up(adjusted.max(chunk_size))
}

/// Payload bytes available in a block of `block_size`.
pub fn usable_size(block_size: usize) -> usize {
    block_size.saturating_sub(TAG_OVERHEAD)
}
