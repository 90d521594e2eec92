//! The allocator engine.
//!
//! [`Engine`] owns one [`ArenaRegion`] and everything written into it:
//! sentinels, boundary tags and free-list links. The lifecycle is:
//!
//! 1. `init()`: reserve the arena, format padding, prologue and
//!    epilogue, then grow by one chunk so the heap starts with a free block
//! 2. `allocate()` / `release()` / `resize()` in any order
//! 3. `deinit()`: consume the engine and release the arena
//!
//! Every mutating call takes `&mut self`; the engine is single-threaded
//! and keeps no global state, so independent engines can coexist.

use tagheap_arena::{ArenaError, ArenaRegion};
use tracing::{debug, trace};

use crate::block::BlockOps;
use crate::check::{self, HeapReport, Violation};
use crate::config::EngineConfig;
use crate::error::HeapError;
use crate::freelist::{FreeBlock, FreeList, Links};
use crate::handle::Payload;
use crate::layout::{
    adjusted_size, extension_size, usable_size, INITIAL_HEAP_SIZE, MIN_BLOCK_SIZE, PROLOGUE,
    PROLOGUE_SIZE,
};
use crate::stats::{BlockInfo, Blocks, EngineCounters, HeapStats};
use crate::tag::BlockTag;

/// First-fit, boundary-tag heap over a single arena.
///
/// # Example
///
/// ```
/// use tagheap_engine::{Engine, EngineConfig};
///
/// let mut heap = Engine::init(EngineConfig::default()).unwrap();
/// let p = heap.allocate(8).unwrap();
/// heap.payload_mut(p)[..5].copy_from_slice(b"hello");
/// assert_eq!(&heap.payload(p)[..5], b"hello");
/// heap.release(p);
/// assert!(heap.check_heap(false).is_ok());
/// ```
#[derive(Debug)]
pub struct Engine {
    /// Backing arena; the engine is its only writer.
    arena: ArenaRegion,
    /// Validated configuration.
    config: EngineConfig,
    /// Cumulative operation counters.
    counters: EngineCounters,
}

impl Engine {
    /// Reserve an arena and format an empty heap in it.
    ///
    /// The heap is grown by one chunk straight away, so a fresh engine
    /// has exactly one free block of `chunk_size` bytes.
    ///
    /// Returns `Err(HeapError::InvalidConfig)` or `Err(HeapError::Arena)`
    /// if the config is invalid or the arena cannot hold the sentinels
    /// plus one chunk.
    pub fn init(config: EngineConfig) -> Result<Self, HeapError> {
        config.validate()?;
        let mut arena = ArenaRegion::new(&config.arena)?;

        let base = arena.extend(INITIAL_HEAP_SIZE as isize)?;
        debug_assert_eq!(base, 0);
        arena.write_word(base, 0);
        arena.set_tags(PROLOGUE, BlockTag::allocated(PROLOGUE_SIZE));
        FreeList::init(&mut arena);
        arena.set_header(arena.next_block(PROLOGUE), BlockTag::EPILOGUE);

        let mut engine = Self {
            arena,
            config,
            counters: EngineCounters::default(),
        };
        engine.extend_heap(engine.config.chunk_size)?;
        debug!(
            reserved = engine.arena.reserved(),
            chunk_size = engine.config.chunk_size,
            heap_size = engine.arena.brk(),
            "heap initialised"
        );
        Ok(engine)
    }

    /// Tear the heap down and release the arena, returning its final mark.
    ///
    /// All payload handles issued by this engine become meaningless.
    pub fn deinit(self) -> usize {
        debug!(
            allocations = self.counters.allocations,
            releases = self.counters.releases,
            "heap torn down"
        );
        self.arena.deinit()
    }

    /// Allocate a block with at least `size` usable bytes.
    ///
    /// Returns `None` for `size == 0` or when the arena cannot grow far
    /// enough. The payload is 16-byte aligned and is not zeroed.
    pub fn allocate(&mut self, size: usize) -> Option<Payload> {
        if size == 0 {
            return None;
        }
        let Some(asize) = adjusted_size(size) else {
            self.counters.failed_allocations += 1;
            return None;
        };

        let block = match FreeList::first_fit(&self.arena, asize) {
            Some(block) => block,
            None => match self.grow_for(asize) {
                Ok(block) => block,
                Err(e) => {
                    debug!(size, error = %e, "allocation failed");
                    self.counters.failed_allocations += 1;
                    return None;
                }
            },
        };

        let p = self.place(block, asize);
        self.counters.allocations += 1;
        trace!(size, block_size = self.arena.header(p).size(), payload = %p, "allocate");
        Some(p)
    }

    /// Release a block. `None` is a no-op.
    ///
    /// The block is merged with any free neighbour before it returns to
    /// the free list. Releasing a handle twice, or one this engine did not
    /// issue, is undefined: it is not detected and may corrupt the heap
    /// metadata (but never memory outside the arena).
    pub fn release(&mut self, payload: impl Into<Option<Payload>>) {
        let Some(p) = payload.into() else {
            return;
        };
        let size = self.arena.header(p).size();
        self.arena.set_tags(p, BlockTag::free(size));
        let merged = self.coalesce(p);
        self.counters.releases += 1;
        trace!(payload = %p, merged = %merged.payload(), "release");
    }

    /// Move a block to one of `size` bytes, preserving its contents.
    ///
    /// - `resize(None, n)` is `allocate(n)`.
    /// - `resize(p, 0)` releases `p` and returns `None`.
    /// - Otherwise a new block is allocated, `min(size, usable_size(p))`
    ///   bytes are copied over, and `p` is released.
    ///
    /// If the new allocation fails, `p` is left untouched and `None` is
    /// returned; the caller still owns `p`.
    pub fn resize(&mut self, payload: impl Into<Option<Payload>>, size: usize) -> Option<Payload> {
        let Some(p) = payload.into() else {
            return self.allocate(size);
        };
        if size == 0 {
            self.release(p);
            return None;
        }

        let new = self.allocate(size)?;
        let copied = size.min(self.usable_size(p));
        self.arena.copy_within(p.offset(), new.offset(), copied);
        self.release(p);
        self.counters.resizes += 1;
        trace!(from = %p, to = %new, copied, "resize");
        Some(new)
    }

    /// Usable bytes of the allocated block at `p`.
    pub fn usable_size(&self, p: Payload) -> usize {
        usable_size(self.arena.header(p).size())
    }

    /// Borrow the usable bytes of the allocated block at `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` lies outside the heap.
    pub fn payload(&self, p: Payload) -> &[u8] {
        debug_assert!(self.arena.header(p).is_allocated(), "read of free block {p}");
        self.arena.bytes(p.offset(), self.usable_size(p))
    }

    /// Mutably borrow the usable bytes of the allocated block at `p`.
    ///
    /// # Panics
    ///
    /// Panics if `p` lies outside the heap.
    pub fn payload_mut(&mut self, p: Payload) -> &mut [u8] {
        debug_assert!(self.arena.header(p).is_allocated(), "write to free block {p}");
        let len = self.usable_size(p);
        self.arena.bytes_mut(p.offset(), len)
    }

    /// Check heap and free-list invariants.
    ///
    /// With `verbose`, every block is dumped at `INFO`. Violations are
    /// logged, and in [`CheckMode::Strict`](crate::CheckMode::Strict)
    /// the first one panics. The heap is never modified.
    pub fn check_heap(&self, verbose: bool) -> HeapReport {
        let report = check::inspect(&self.arena, verbose);
        check::enforce(&report, self.config.check_mode);
        report
    }

    /// Check the heap silently, returning the first violation if any.
    pub fn validate(&self) -> Result<HeapStats, Violation> {
        let mut report = check::inspect(&self.arena, false);
        if report.violations.is_empty() {
            Ok(report.stats)
        } else {
            Err(report.violations.swap_remove(0))
        }
    }

    /// Tally the heap's blocks.
    pub fn stats(&self) -> HeapStats {
        HeapStats::collect(&self.arena)
    }

    /// Cumulative operation counters.
    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    /// Blocks between the sentinels, in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(&self.arena)
    }

    /// Free blocks in free-list order (most recently freed first).
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        FreeList::iter(&self.arena).map(|b| BlockInfo {
            payload: b.payload(),
            tag: self.arena.header(b.payload()),
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read-only view of the backing arena.
    pub fn arena(&self) -> &ArenaRegion {
        &self.arena
    }

    #[cfg(test)]
    pub(crate) fn arena_mut(&mut self) -> &mut ArenaRegion {
        &mut self.arena
    }

    /// Mark `block` allocated at `asize` bytes, splitting off the tail if
    /// it can stand as a block of its own.
    ///
    /// The split-off tail takes `block`'s place in the free list.
    fn place(&mut self, block: FreeBlock, asize: usize) -> Payload {
        let p = block.payload();
        let current = self.arena.header(p).size();

        if current - asize >= MIN_BLOCK_SIZE {
            let links = Links::of(&self.arena, block);
            self.arena.set_tags(p, BlockTag::allocated(asize));
            let rest = self.arena.next_block(p);
            self.arena.set_tags(rest, BlockTag::free(current - asize));
            let rest = FreeBlock::known(&self.arena, rest);
            FreeList::take_position(&mut self.arena, links, rest);
        } else {
            FreeList::remove(&mut self.arena, block);
            self.arena.set_tags(p, BlockTag::allocated(current));
        }
        p
    }

    /// Grow the heap enough to hold a block of `asize` bytes.
    fn grow_for(&mut self, asize: usize) -> Result<FreeBlock, ArenaError> {
        let bytes = extension_size(asize, self.config.chunk_size);
        let bytes = bytes.ok_or_else(|| ArenaError::Exhausted {
            requested: asize,
            remaining: self.arena.remaining(),
        })?;
        self.extend_heap(bytes)
    }

    /// Grow the arena by `bytes`, format the new span as a free block
    /// with a fresh epilogue after it, and coalesce it backwards.
    ///
    /// The old epilogue header becomes the new block's header.
    fn extend_heap(&mut self, bytes: usize) -> Result<FreeBlock, ArenaError> {
        let increment = isize::try_from(bytes).map_err(|_| ArenaError::Exhausted {
            requested: bytes,
            remaining: self.arena.remaining(),
        })?;
        let old_brk = self.arena.extend(increment)?;

        let p = Payload::new(old_brk);
        self.arena.set_tags(p, BlockTag::free(bytes));
        let epilogue = self.arena.next_block(p);
        self.arena.set_header(epilogue, BlockTag::EPILOGUE);
        debug_assert_eq!(epilogue.offset(), self.arena.brk());

        self.counters.extensions += 1;
        debug!(bytes, heap_size = self.arena.brk(), "heap extended");
        Ok(self.coalesce(p))
    }

    /// Merge the free block at `p` with free neighbours and put the result
    /// at the head of the free list.
    ///
    /// `p`'s tags must already say free. The sentinels are allocated, so
    /// neither neighbour lookup can leave the formatted heap.
    fn coalesce(&mut self, p: Payload) -> FreeBlock {
        let mut size = self.arena.header(p).size();
        let prev_alloc = self.arena.prev_footer(p).is_allocated();
        let next = self.arena.next_block(p);
        let next_alloc = self.arena.header(next).is_allocated();

        let merged = match (prev_alloc, next_alloc) {
            (true, true) => p,
            (true, false) => {
                size += self.arena.header(next).size();
                let next = FreeBlock::known(&self.arena, next);
                FreeList::remove(&mut self.arena, next);
                self.arena.set_tags(p, BlockTag::free(size));
                p
            }
            (false, true) => {
                let prev = self.arena.prev_block(p);
                size += self.arena.header(prev).size();
                let prev_block = FreeBlock::known(&self.arena, prev);
                FreeList::remove(&mut self.arena, prev_block);
                self.arena.set_tags(prev, BlockTag::free(size));
                prev
            }
            (false, false) => {
                let prev = self.arena.prev_block(p);
                size += self.arena.header(prev).size() + self.arena.header(next).size();
                let prev_block = FreeBlock::known(&self.arena, prev);
                let next_block = FreeBlock::known(&self.arena, next);
                FreeList::remove(&mut self.arena, prev_block);
                FreeList::remove(&mut self.arena, next_block);
                self.arena.set_tags(prev, BlockTag::free(size));
                prev
            }
        };

        let merged = FreeBlock::known(&self.arena, merged);
        FreeList::insert_at_head(&mut self.arena, merged);
        merged
    }
}
