//! Heap statistics and address-order block walking.
//!
//! [`HeapStats`] is computed on demand by walking every block between the
//! sentinels. [`EngineCounters`] are cumulative and maintained by the
//! engine as it runs.

use tagheap_arena::ArenaRegion;

use crate::block::BlockOps;
use crate::handle::Payload;
use crate::layout::{usable_size, PROLOGUE, SENTINEL_OVERHEAD, WORD_SIZE};
use crate::tag::BlockTag;

/// One block seen during an address-order walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Payload handle of the block.
    pub payload: Payload,
    /// Decoded header.
    pub tag: BlockTag,
}

impl BlockInfo {
    /// Payload bytes available in this block.
    pub fn usable_size(&self) -> usize {
        usable_size(self.tag.size())
    }
}

/// Address-order iterator over the blocks between prologue and epilogue.
///
/// Stops at the epilogue, or early if a header would fall outside the
/// formatted arena.
pub struct Blocks<'a> {
    arena: &'a ArenaRegion,
    cursor: Payload,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(arena: &'a ArenaRegion) -> Self {
        Self {
            arena,
            cursor: arena.next_block(PROLOGUE),
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.cursor.offset() > self.arena.brk() {
            return None;
        }
        let tag = self.arena.header(self.cursor);
        if tag.size() == 0 {
            return None;
        }
        let end = self
            .cursor
            .offset()
            .checked_add(tag.size())
            .filter(|&end| end <= self.arena.brk() + WORD_SIZE)?;
        let info = BlockInfo {
            payload: self.cursor,
            tag,
        };
        self.cursor = Payload::new(end);
        Some(info)
    }
}

/// Snapshot of heap occupancy.
///
/// Sizes are whole block sizes (tags included), so for a consistent heap
/// `free_bytes + allocated_bytes + overhead_bytes == heap_size`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Current arena mark in bytes.
    pub heap_size: usize,
    /// Number of blocks between the sentinels.
    pub block_count: usize,
    /// Number of allocated blocks.
    pub allocated_blocks: usize,
    /// Total size of allocated blocks.
    pub allocated_bytes: usize,
    /// Payload bytes usable by callers across allocated blocks.
    pub payload_bytes: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Total size of free blocks.
    pub free_bytes: usize,
    /// Size of the largest free block, zero if none.
    pub largest_free: usize,
    /// Padding word plus prologue and epilogue.
    pub overhead_bytes: usize,
}

impl HeapStats {
    /// Walk `arena` and tally every block.
    pub(crate) fn collect(arena: &ArenaRegion) -> Self {
        let mut stats = Self {
            heap_size: arena.brk(),
            overhead_bytes: SENTINEL_OVERHEAD,
            ..Self::default()
        };
        for block in Blocks::new(arena) {
            stats.block_count += 1;
            let size = block.tag.size();
            if block.tag.is_allocated() {
                stats.allocated_blocks += 1;
                stats.allocated_bytes += size;
                stats.payload_bytes += block.usable_size();
            } else {
                stats.free_blocks += 1;
                stats.free_bytes += size;
                stats.largest_free = stats.largest_free.max(size);
            }
        }
        stats
    }

    /// Whether every byte of the heap is accounted for.
    pub fn is_balanced(&self) -> bool {
        self.free_bytes + self.allocated_bytes + self.overhead_bytes == self.heap_size
    }

    /// Fraction of free bytes outside the largest free block.
    ///
    /// Zero when there is no free space or it is all one block.
    pub fn external_fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

/// Cumulative operation counters for one engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineCounters {
    /// Successful allocations (including those made by `resize`).
    pub allocations: u64,
    /// Blocks released (including those released by `resize`).
    pub releases: u64,
    /// `resize` calls that moved a block.
    pub resizes: u64,
    /// Successful arena extensions, including the one made by `init`.
    pub extensions: u64,
    /// Nonzero requests that returned `None`.
    pub failed_allocations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = HeapStats::default();
        assert_eq!(s.heap_size, 0);
        assert_eq!(s.block_count, 0);
        assert!(s.is_balanced());
        assert_eq!(s.external_fragmentation(), 0.0);
    }

    #[test]
    fn fragmentation_measures_scatter() {
        let s = HeapStats {
            free_bytes: 200,
            largest_free: 50,
            ..HeapStats::default()
        };
        assert!((s.external_fragmentation() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn block_info_usable_size_excludes_tags() {
        let info = BlockInfo {
            payload: Payload::new(48),
            tag: BlockTag::allocated(48),
        };
        assert_eq!(info.usable_size(), 32);
    }

    #[test]
    fn default_counters_are_zero() {
        let c = EngineCounters::default();
        assert_eq!(c.allocations, 0);
        assert_eq!(c.releases, 0);
        assert_eq!(c.extensions, 0);
    }
}
