//! Block addressing over an [`ArenaRegion`].
//!
//! ```text
//!            header_of(p)      p                         footer_of(p)
//!                 │            │                              │
//!   ... ──────────┼────────────┼──────────────────────────────┼──────────┬── ...
//!   prev footer   │ [size | a] │ payload (links when free)    │ [size|a] │ next header
//!   ... ──────────┴────────────┴──────────────────────────────┴──────────┴── ...
//!                 └───────────────────── size bytes ─────────────────────┘
//! ```
//!
//! All arithmetic is derived from the size recorded in the header, so a
//! footer offset is only correct while that header is current.

use tagheap_arena::ArenaRegion;

use crate::handle::Payload;
use crate::layout::WORD_SIZE;
use crate::tag::BlockTag;

/// Offset of the header word of the block whose payload is `p`.
pub fn header_of(p: Payload) -> usize {
    p.header_offset()
}

/// Boundary-tag accessors for a formatted heap.
pub(crate) trait BlockOps {
    /// Decoded header of the block at `p`.
    fn header(&self, p: Payload) -> BlockTag;

    /// Offset of the footer word of the block at `p`, per its header.
    fn footer_of(&self, p: Payload) -> usize;

    /// Decoded footer of the block at `p`.
    fn footer(&self, p: Payload) -> BlockTag;

    /// Decoded footer of the block physically before `p`.
    fn prev_footer(&self, p: Payload) -> BlockTag;

    /// Payload of the block physically after `p`.
    fn next_block(&self, p: Payload) -> Payload;

    /// Payload of the block physically before `p`.
    fn prev_block(&self, p: Payload) -> Payload;

    /// Write only the header of the block at `p`.
    fn set_header(&mut self, p: Payload, tag: BlockTag);

    /// Write header and footer of the block at `p` with the same tag.
    ///
    /// The header goes first so the footer lands at the new size.
    fn set_tags(&mut self, p: Payload, tag: BlockTag);
}

impl BlockOps for ArenaRegion {
    fn header(&self, p: Payload) -> BlockTag {
        BlockTag::decode(self.read_word(header_of(p)))
    }

    fn footer_of(&self, p: Payload) -> usize {
        p.offset() + self.header(p).size() - 2 * WORD_SIZE
    }

    fn footer(&self, p: Payload) -> BlockTag {
        BlockTag::decode(self.read_word(self.footer_of(p)))
    }

    fn prev_footer(&self, p: Payload) -> BlockTag {
        BlockTag::decode(self.read_word(header_of(p) - WORD_SIZE))
    }

    fn next_block(&self, p: Payload) -> Payload {
        Payload::new(p.offset() + self.header(p).size())
    }

    fn prev_block(&self, p: Payload) -> Payload {
        Payload::new(p.offset() - self.prev_footer(p).size())
    }

    fn set_header(&mut self, p: Payload, tag: BlockTag) {
        self.write_word(header_of(p), tag.encode());
    }

    fn set_tags(&mut self, p: Payload, tag: BlockTag) {
        self.set_header(p, tag);
        let footer = self.footer_of(p);
        self.write_word(footer, tag.encode());
    }
}
