//! Explicit, circular, doubly-linked free list threaded through payloads.
//!
//! A free block stores two link words at the start of its payload:
//!
//! ```text
//! p + 0 : prev_free (payload offset)
//! p + 8 : next_free (payload offset)
//! ```
//!
//! The prologue block carries the same two words and acts as the list's
//! sentinel, so insertion and removal never deal with an empty list.
//! Newly freed blocks go right after the sentinel; first-fit search walks
//! forward from there.

use tagheap_arena::ArenaRegion;

use crate::block::BlockOps;
use crate::handle::Payload;
use crate::layout::{PROLOGUE, WORD_SIZE};

/// Link value meaning "not linked".
const NULL_LINK: u64 = 0;

/// A block whose payload may be read as free-list links.
///
/// Only obtainable for the sentinel or for a block whose tag says free,
/// so link reads never reinterpret an allocated payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FreeBlock(Payload);

impl FreeBlock {
    /// The list sentinel (prologue payload).
    pub(crate) const SENTINEL: Self = Self(PROLOGUE);

    /// Wrap `p` if its header says free (or it is the sentinel).
    pub(crate) fn checked(arena: &ArenaRegion, p: Payload) -> Option<Self> {
        (p == PROLOGUE || arena.header(p).is_free()).then_some(Self(p))
    }

    /// Wrap `p`, which the caller knows to be free.
    pub(crate) fn known(arena: &ArenaRegion, p: Payload) -> Self {
        debug_assert!(
            p == PROLOGUE || arena.header(p).is_free(),
            "block {p} used as free-list node while allocated"
        );
        Self(p)
    }

    /// The wrapped payload.
    pub(crate) fn payload(self) -> Payload {
        self.0
    }

    fn prev(self, arena: &ArenaRegion) -> u64 {
        arena.read_word(self.0.offset())
    }

    fn next(self, arena: &ArenaRegion) -> u64 {
        arena.read_word(self.0.offset() + WORD_SIZE)
    }

    fn set_prev(self, arena: &mut ArenaRegion, to: Payload) {
        arena.write_word(self.0.offset(), to.offset() as u64);
    }

    fn set_next(self, arena: &mut ArenaRegion, to: Payload) {
        arena.write_word(self.0.offset() + WORD_SIZE, to.offset() as u64);
    }
}

/// Raw link words of a list node, as stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) prev: u64,
    pub(crate) next: u64,
}

impl Links {
    /// Read both links of `block`.
    pub(crate) fn of(arena: &ArenaRegion, block: FreeBlock) -> Self {
        Self {
            prev: block.prev(arena),
            next: block.next(arena),
        }
    }
}

/// Read the link words at `p` without any tag check.
///
/// For the heap checker, which must inspect nodes it does not trust.
pub(crate) fn raw_links(arena: &ArenaRegion, p: Payload) -> Links {
    Links {
        prev: arena.read_word(p.offset()),
        next: arena.read_word(p.offset() + WORD_SIZE),
    }
}

fn node(link: u64) -> Payload {
    Payload::new(link as usize)
}

/// Operations on the free list anchored at the prologue.
pub(crate) struct FreeList;

impl FreeList {
    /// Point the sentinel at itself: an empty list.
    pub(crate) fn init(arena: &mut ArenaRegion) {
        FreeBlock::SENTINEL.set_prev(arena, PROLOGUE);
        FreeBlock::SENTINEL.set_next(arena, PROLOGUE);
    }

    /// Insert `block` immediately after the sentinel.
    pub(crate) fn insert_at_head(arena: &mut ArenaRegion, block: FreeBlock) {
        let head = node(FreeBlock::SENTINEL.next(arena));
        block.set_prev(arena, PROLOGUE);
        block.set_next(arena, head);
        FreeBlock(head).set_prev(arena, block.payload());
        FreeBlock::SENTINEL.set_next(arena, block.payload());
    }

    /// Unlink `block` by stitching its neighbours together.
    ///
    /// A null link on either side leaves that side untouched.
    pub(crate) fn remove(arena: &mut ArenaRegion, block: FreeBlock) {
        let links = Links::of(arena, block);
        Self::stitch(arena, links);
    }

    /// Link `replacement` into the position described by `links`, the
    /// links a just-removed node used to have.
    pub(crate) fn take_position(arena: &mut ArenaRegion, links: Links, replacement: FreeBlock) {
        let (prev, next) = (node(links.prev), node(links.next));
        replacement.set_prev(arena, prev);
        replacement.set_next(arena, next);
        FreeBlock(prev).set_next(arena, replacement.payload());
        FreeBlock(next).set_prev(arena, replacement.payload());
    }

    /// First block in list order whose size is at least `size`.
    pub(crate) fn first_fit(arena: &ArenaRegion, size: usize) -> Option<FreeBlock> {
        Self::iter(arena).find(|&b| arena.header(b.payload()).size() >= size)
    }

    /// Walk the list from the sentinel's successor back to the sentinel.
    pub(crate) fn iter(arena: &ArenaRegion) -> Iter<'_> {
        Iter {
            arena,
            cursor: node(FreeBlock::SENTINEL.next(arena)),
        }
    }

    fn stitch(arena: &mut ArenaRegion, links: Links) {
        if links.prev != NULL_LINK {
            FreeBlock(node(links.prev)).set_next(arena, node(links.next));
        }
        if links.next != NULL_LINK {
            FreeBlock(node(links.next)).set_prev(arena, node(links.prev));
        }
    }
}

/// Iterator over free blocks in list order.
///
/// Assumes a well-formed list; the checker walks untrusted lists itself.
pub(crate) struct Iter<'a> {
    arena: &'a ArenaRegion,
    cursor: Payload,
}

impl Iterator for Iter<'_> {
    type Item = FreeBlock;

    fn next(&mut self) -> Option<FreeBlock> {
        if self.cursor == PROLOGUE {
            return None;
        }
        let block = FreeBlock(self.cursor);
        self.cursor = node(block.next(self.arena));
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::BlockTag;
    use tagheap_arena::ArenaConfig;

    /// Prologue plus three free 32-byte blocks at 48, 80, 112.
    fn heap() -> ArenaRegion {
        let mut arena = ArenaRegion::new(&ArenaConfig::new(1024)).unwrap();
        arena.extend(152).unwrap();
        arena.set_tags(PROLOGUE, BlockTag::allocated(32));
        FreeList::init(&mut arena);
        for off in [48, 80, 112] {
            arena.set_tags(Payload::new(off), BlockTag::free(32));
        }
        arena.set_header(Payload::new(144), BlockTag::EPILOGUE);
        arena
    }

    fn order(arena: &ArenaRegion) -> Vec<usize> {
        FreeList::iter(arena).map(|b| b.payload().offset()).collect()
    }

    fn free(arena: &ArenaRegion, off: usize) -> FreeBlock {
        FreeBlock::known(arena, Payload::new(off))
    }

    #[test]
    fn empty_list_yields_nothing() {
        let arena = heap();
        assert!(order(&arena).is_empty());
        assert!(FreeList::first_fit(&arena, 16).is_none());
    }

    #[test]
    fn insert_at_head_is_lifo() {
        let mut arena = heap();
        for off in [48, 80, 112] {
            let b = free(&arena, off);
            FreeList::insert_at_head(&mut arena, b);
        }
        assert_eq!(order(&arena), vec![112, 80, 48]);
    }

    #[test]
    fn remove_middle_stitches_neighbours() {
        let mut arena = heap();
        for off in [48, 80, 112] {
            let b = free(&arena, off);
            FreeList::insert_at_head(&mut arena, b);
        }
        let mid = free(&arena, 80);
        FreeList::remove(&mut arena, mid);
        assert_eq!(order(&arena), vec![112, 48]);
        let links = Links::of(&arena, free(&arena, 48));
        assert_eq!(links.prev, 112);
        assert_eq!(links.next, PROLOGUE.offset() as u64);
    }

    #[test]
    fn remove_with_null_links_is_noop() {
        let mut arena = heap();
        let b = free(&arena, 48);
        FreeList::insert_at_head(&mut arena, b);
        // Block 80 was never linked; its link words are zero.
        let orphan = free(&arena, 80);
        FreeList::remove(&mut arena, orphan);
        assert_eq!(order(&arena), vec![48]);
    }

    #[test]
    fn take_position_preserves_order() {
        let mut arena = heap();
        for off in [48, 112] {
            let b = free(&arena, off);
            FreeList::insert_at_head(&mut arena, b);
        }
        // List: 112, 48. Replace 112 with 80 in place.
        let old = free(&arena, 112);
        let links = Links::of(&arena, old);
        let replacement = free(&arena, 80);
        FreeList::take_position(&mut arena, links, replacement);
        assert_eq!(order(&arena), vec![80, 48]);
    }

    #[test]
    fn first_fit_returns_earliest_in_list_order() {
        let mut arena = heap();
        arena.set_tags(Payload::new(48), BlockTag::free(64));
        arena.set_tags(Payload::new(112), BlockTag::free(32));
        for off in [48, 112] {
            let b = free(&arena, off);
            FreeList::insert_at_head(&mut arena, b);
        }
        assert_eq!(
            FreeList::first_fit(&arena, 32).map(|b| b.payload().offset()),
            Some(112)
        );
        assert_eq!(
            FreeList::first_fit(&arena, 48).map(|b| b.payload().offset()),
            Some(48)
        );
        assert!(FreeList::first_fit(&arena, 80).is_none());
    }

    #[test]
    fn checked_rejects_allocated_blocks() {
        let mut arena = heap();
        arena.set_tags(Payload::new(80), BlockTag::allocated(32));
        assert!(FreeBlock::checked(&arena, Payload::new(80)).is_none());
        assert!(FreeBlock::checked(&arena, Payload::new(48)).is_some());
        assert!(FreeBlock::checked(&arena, PROLOGUE).is_some());
    }
}
