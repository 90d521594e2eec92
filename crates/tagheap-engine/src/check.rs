//! Heap consistency checking.
//!
//! The checker trusts nothing it reads: every offset is bounds-checked
//! before it is dereferenced, and the free-list walk is capped so a
//! corrupted cycle cannot hang it. It never writes to the arena.

use std::fmt;

use smallvec::SmallVec;
use tagheap_arena::ArenaRegion;
use tracing::{error, info, warn};

use crate::block::BlockOps;
use crate::freelist::{raw_links, FreeBlock};
use crate::handle::Payload;
use crate::layout::{ALIGNMENT, MIN_BLOCK_SIZE, PROLOGUE, PROLOGUE_SIZE, WORD_SIZE};
use crate::stats::HeapStats;
use crate::tag::BlockTag;

/// What `check_heap` does with the violations it finds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckMode {
    /// Log each violation at `ERROR` and panic on the first one.
    Strict,
    /// Log each violation at `WARN` and return them in the report.
    #[default]
    Lenient,
}

/// A broken heap invariant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// Prologue tags are not `[32:a]`.
    BadPrologue {
        /// Decoded prologue header.
        header: BlockTag,
        /// Decoded prologue footer.
        footer: BlockTag,
    },
    /// Epilogue header is not `[0:a]` in the last word of the heap.
    BadEpilogue {
        /// Payload offset where the walk stopped.
        offset: usize,
        /// Decoded tag found there.
        tag: BlockTag,
    },
    /// A block payload is not 16-byte aligned.
    Misaligned {
        /// The offending payload offset.
        offset: usize,
    },
    /// Header and footer of a block disagree.
    TagMismatch {
        /// Payload offset of the block.
        offset: usize,
        /// Decoded header.
        header: BlockTag,
        /// Decoded footer.
        footer: BlockTag,
    },
    /// A block claims to extend past the end of the heap.
    Overrun {
        /// Payload offset of the block.
        offset: usize,
        /// Size recorded in its header.
        size: usize,
    },
    /// Two free blocks are adjacent; coalescing should have merged them.
    Uncoalesced {
        /// Payload offset of the lower block.
        first: usize,
        /// Payload offset of the upper block.
        second: usize,
    },
    /// A free-list node is marked allocated.
    ListedBlockAllocated {
        /// Payload offset of the node.
        offset: usize,
    },
    /// A node's neighbours do not point back at it.
    LinkMismatch {
        /// Payload offset of the node.
        offset: usize,
    },
    /// A link points outside the heap or at a misaligned offset.
    LinkOutOfBounds {
        /// Payload offset of the node holding the link.
        from: usize,
        /// The link value.
        link: u64,
    },
    /// The free list does not return to the sentinel.
    ListNotClosed {
        /// Nodes visited before giving up.
        visited: usize,
    },
    /// The address walk and the free list disagree on how many blocks are free.
    FreeCountMismatch {
        /// Free blocks found walking by address.
        in_heap: usize,
        /// Nodes found walking the list.
        in_list: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadPrologue { header, footer } => {
                write!(f, "bad prologue: header {header}, footer {footer}")
            }
            Self::BadEpilogue { offset, tag } => {
                write!(f, "bad epilogue header at {offset:#x}: {tag}")
            }
            Self::Misaligned { offset } => {
                write!(f, "{offset:#x} is not doubleword aligned")
            }
            Self::TagMismatch {
                offset,
                header,
                footer,
            } => write!(
                f,
                "header does not match footer at {offset:#x}: {header} vs {footer}"
            ),
            Self::Overrun { offset, size } => {
                write!(f, "block at {offset:#x} of size {size} runs past the heap")
            }
            Self::Uncoalesced { first, second } => {
                write!(f, "adjacent free blocks at {first:#x} and {second:#x}")
            }
            Self::ListedBlockAllocated { offset } => {
                write!(f, "free block marked as allocated: {offset:#x}")
            }
            Self::LinkMismatch { offset } => {
                write!(f, "free list pointers inconsistent: {offset:#x}")
            }
            Self::LinkOutOfBounds { from, link } => {
                write!(f, "free list link {link:#x} from {from:#x} leaves the heap")
            }
            Self::ListNotClosed { visited } => {
                write!(f, "free list not closed after {visited} nodes")
            }
            Self::FreeCountMismatch { in_heap, in_list } => write!(
                f,
                "{in_heap} free blocks in heap but {in_list} in free list"
            ),
        }
    }
}

/// Result of a heap check.
#[derive(Clone, Debug)]
pub struct HeapReport {
    /// Occupancy tallied during the walk.
    pub stats: HeapStats,
    /// Nodes reached walking the free list.
    pub free_list_len: usize,
    /// Every violation found, in discovery order.
    pub violations: SmallVec<[Violation; 4]>,
}

impl HeapReport {
    /// Whether the heap passed every check.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Run every check over `arena`, dumping blocks at `INFO` when `verbose`.
pub(crate) fn inspect(arena: &ArenaRegion, verbose: bool) -> HeapReport {
    let mut violations = SmallVec::new();

    if verbose {
        match arena.heap_hi() {
            Some(hi) => info!("heap ({:#x}..={hi:#x}):", arena.heap_lo()),
            None => info!("heap ({:#x}): empty", arena.heap_lo()),
        }
    }
    check_prologue(arena, verbose, &mut violations);
    let in_heap = walk_blocks(arena, verbose, &mut violations);
    let in_list = walk_free_list(arena, &mut violations);

    if in_list != in_heap {
        violations.push(Violation::FreeCountMismatch { in_heap, in_list });
    }

    HeapReport {
        stats: HeapStats::collect(arena),
        free_list_len: in_list,
        violations,
    }
}

/// Report `report`'s violations according to `mode`.
///
/// # Panics
///
/// Panics in [`CheckMode::Strict`] if the report has any violation.
pub(crate) fn enforce(report: &HeapReport, mode: CheckMode) {
    match mode {
        CheckMode::Lenient => {
            for v in &report.violations {
                warn!(violation = %v, "heap check");
            }
        }
        CheckMode::Strict => {
            for v in &report.violations {
                error!(violation = %v, "heap check");
            }
            if let Some(first) = report.violations.first() {
                panic!("heap check failed: {first}");
            }
        }
    }
}

fn check_prologue(arena: &ArenaRegion, verbose: bool, out: &mut SmallVec<[Violation; 4]>) {
    let header = arena.header(PROLOGUE);
    let footer_offset = PROLOGUE.offset() + PROLOGUE_SIZE - 2 * WORD_SIZE;
    let footer = BlockTag::decode(arena.read_word(footer_offset));
    let expected = BlockTag::allocated(PROLOGUE_SIZE);
    if verbose {
        dump_block(arena, PROLOGUE, header, Some(footer));
    }
    if header != expected || footer != expected {
        out.push(Violation::BadPrologue { header, footer });
    }
}

/// Walk by address from the first block to the epilogue.
///
/// Returns the number of free blocks seen.
fn walk_blocks(arena: &ArenaRegion, verbose: bool, out: &mut SmallVec<[Violation; 4]>) -> usize {
    let brk = arena.brk();
    let mut p = Payload::new(PROLOGUE.offset() + PROLOGUE_SIZE);
    let mut prev_free: Option<Payload> = None;
    let mut free = 0;

    loop {
        if p.offset() > brk {
            out.push(Violation::Overrun {
                offset: p.offset(),
                size: 0,
            });
            return free;
        }
        let tag = arena.header(p);
        if tag.size() == 0 {
            if verbose {
                info!("{p}: EOL");
            }
            if !tag.is_allocated() || p.offset() != brk {
                out.push(Violation::BadEpilogue {
                    offset: p.offset(),
                    tag,
                });
            }
            return free;
        }
        if p.offset() % ALIGNMENT != 0 {
            out.push(Violation::Misaligned { offset: p.offset() });
        }
        let end = p.offset().checked_add(tag.size());
        let Some(end) = end.filter(|&end| end <= brk + WORD_SIZE) else {
            out.push(Violation::Overrun {
                offset: p.offset(),
                size: tag.size(),
            });
            return free;
        };

        let footer = arena.footer(p);
        if verbose {
            dump_block(arena, p, tag, Some(footer));
        }
        if footer != tag {
            out.push(Violation::TagMismatch {
                offset: p.offset(),
                header: tag,
                footer,
            });
        }
        if tag.is_free() {
            free += 1;
            if let Some(prev) = prev_free {
                out.push(Violation::Uncoalesced {
                    first: prev.offset(),
                    second: p.offset(),
                });
            }
        }
        prev_free = tag.is_free().then_some(p);
        p = Payload::new(end);
    }
}

/// Whether `link` names a payload whose link words lie inside the heap.
fn link_in_bounds(arena: &ArenaRegion, link: u64) -> bool {
    let Ok(off) = usize::try_from(link) else {
        return false;
    };
    off % ALIGNMENT == 0 && off >= PROLOGUE.offset() && off + 2 * WORD_SIZE <= arena.brk()
}

/// Walk the free list from the sentinel, checking link symmetry.
///
/// Returns the number of nodes visited, sentinel excluded.
fn walk_free_list(arena: &ArenaRegion, out: &mut SmallVec<[Violation; 4]>) -> usize {
    let limit = arena.brk() / MIN_BLOCK_SIZE + 1;
    let mut from = PROLOGUE;
    let mut link = raw_links(arena, PROLOGUE).next;
    let mut visited = 0;

    loop {
        if !link_in_bounds(arena, link) {
            out.push(Violation::LinkOutOfBounds {
                from: from.offset(),
                link,
            });
            return visited;
        }
        let p = Payload::new(link as usize);
        if p == PROLOGUE {
            return visited;
        }
        visited += 1;
        if visited > limit {
            out.push(Violation::ListNotClosed { visited });
            return visited;
        }

        if FreeBlock::checked(arena, p).is_none() {
            out.push(Violation::ListedBlockAllocated { offset: p.offset() });
        }
        let links = raw_links(arena, p);
        let next_ok = link_in_bounds(arena, links.next)
            && raw_links(arena, Payload::new(links.next as usize)).prev == link;
        let prev_ok = link_in_bounds(arena, links.prev)
            && raw_links(arena, Payload::new(links.prev as usize)).next == link;
        if !next_ok || !prev_ok {
            out.push(Violation::LinkMismatch { offset: p.offset() });
        }

        from = p;
        link = links.next;
    }
}

fn dump_block(arena: &ArenaRegion, p: Payload, header: BlockTag, footer: Option<BlockTag>) {
    let footer = footer.map_or_else(|| "-".to_string(), |t| t.to_string());
    if (header.is_free() || p == PROLOGUE) && p.offset() + 2 * WORD_SIZE <= arena.brk() {
        let links = raw_links(arena, p);
        info!(
            "{p}: header: {header} {{{:#x}|{:#x}}} footer: {footer}",
            links.prev, links.next
        );
    } else {
        info!("{p}: header: {header} {{}} footer: {footer}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::header_of;
    use crate::{Engine, EngineConfig};

    fn engine() -> Engine {
        Engine::init(EngineConfig::new(64 * 1024)).unwrap()
    }

    #[test]
    fn fresh_heap_is_clean() {
        let e = engine();
        let report = inspect(e.arena(), false);
        assert!(report.is_ok(), "{:?}", report.violations);
        assert_eq!(report.free_list_len, 1);
        assert_eq!(report.stats.free_blocks, 1);
    }

    #[test]
    fn verbose_dump_does_not_change_result() {
        let mut e = engine();
        let _p = e.allocate(100).unwrap();
        let quiet = inspect(e.arena(), false);
        let loud = inspect(e.arena(), true);
        assert_eq!(quiet.violations, loud.violations);
        assert_eq!(quiet.stats, loud.stats);
    }

    #[test]
    fn footer_corruption_detected() {
        let mut e = engine();
        let p = e.allocate(64).unwrap();
        let footer = e.arena().footer_of(p);
        e.arena_mut().write_word(footer, BlockTag::allocated(999 * 16).encode());
        let report = inspect(e.arena(), false);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::TagMismatch { .. })));
    }

    #[test]
    fn prologue_corruption_detected() {
        let mut e = engine();
        e.arena_mut().set_header(PROLOGUE, BlockTag::free(32));
        let report = inspect(e.arena(), false);
        assert!(matches!(
            report.violations.first(),
            Some(Violation::BadPrologue { .. })
        ));
    }

    #[test]
    fn allocated_block_in_list_detected() {
        let mut e = engine();
        let p = e.allocate(64).unwrap();
        e.release(p);
        // Flip the free block back to allocated behind the engine's back.
        let head = raw_links(e.arena(), PROLOGUE).next as usize;
        let size = e.arena().header(Payload::new(head)).size();
        e.arena_mut().set_tags(Payload::new(head), BlockTag::allocated(size));
        let report = inspect(e.arena(), false);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::ListedBlockAllocated { .. })));
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::FreeCountMismatch { .. })));
    }

    #[test]
    fn wild_link_detected_without_panic() {
        let mut e = engine();
        let head = raw_links(e.arena(), PROLOGUE).next as usize;
        e.arena_mut().write_word(head + WORD_SIZE, 0xFFFF_FFF0);
        let report = inspect(e.arena(), false);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::LinkOutOfBounds { .. })));
    }

    #[test]
    fn huge_size_word_reported_without_panic() {
        let mut e = engine();
        let p = e.allocate(64).unwrap();
        e.arena_mut().write_word(header_of(p), 0xFFFF_FFFF_FFFF_FFF1);
        let report = e.check_heap(true);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Overrun { offset, .. } if *offset == p.offset())));
        assert_eq!(report.stats.block_count, 0);
        assert_eq!(e.blocks().count(), 0);
    }

    #[test]
    fn corrupted_footer_before_free_pair_does_not_underflow() {
        let mut e = engine();
        let a = e.allocate(64).unwrap();
        let b = e.allocate(64).unwrap();
        let _fence = e.allocate(64).unwrap();
        e.release(a);
        // Force two adjacent free blocks, then make the first footer absurd.
        e.arena_mut().set_tags(b, BlockTag::free(80));
        let footer = e.arena().footer_of(a);
        e.arena_mut().write_word(footer, BlockTag::free(0xFFFF_0000).encode());
        let report = e.check_heap(false);
        let pair = Violation::Uncoalesced {
            first: a.offset(),
            second: b.offset(),
        };
        assert!(report.violations.contains(&pair));
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::TagMismatch { .. })));
    }

    #[test]
    fn self_loop_detected() {
        let mut e = engine();
        let head = raw_links(e.arena(), PROLOGUE).next;
        e.arena_mut().write_word(head as usize + WORD_SIZE, head);
        let report = inspect(e.arena(), false);
        assert!(!report.is_ok());
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::ListNotClosed { .. })));
    }

    #[test]
    fn lenient_enforce_returns() {
        let mut e = engine();
        e.arena_mut().set_header(PROLOGUE, BlockTag::free(32));
        let report = inspect(e.arena(), false);
        enforce(&report, CheckMode::Lenient);
    }

    #[test]
    #[should_panic(expected = "heap check failed")]
    fn strict_enforce_panics() {
        let mut e = engine();
        e.arena_mut().set_header(PROLOGUE, BlockTag::free(32));
        let report = inspect(e.arena(), false);
        enforce(&report, CheckMode::Strict);
    }

    #[test]
    fn violation_messages_are_descriptive() {
        let v = Violation::Misaligned { offset: 0x38 };
        assert_eq!(v.to_string(), "0x38 is not doubleword aligned");
        let v = Violation::FreeCountMismatch {
            in_heap: 2,
            in_list: 1,
        };
        assert!(v.to_string().contains("2 free blocks"));
    }
}
