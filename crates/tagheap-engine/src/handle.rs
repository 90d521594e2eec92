//! Payload handles.
//!
//! A [`Payload`] is the allocator's stand-in for a pointer: the byte offset
//! of a block's payload within the arena. Handles are only meaningful for
//! the [`Engine`](crate::Engine) that issued them.

use std::fmt;

/// Offset of a block payload within the arena.
///
/// Always a multiple of 16 when returned by the engine. "Null" is
/// expressed as `Option<Payload>::None`, never as a special offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct Payload(usize);

impl Payload {
    /// Wrap a raw payload offset.
    pub(crate) const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Byte offset of the payload within the arena.
    pub const fn offset(self) -> usize {
        self.0
    }

    /// Offset of this block's header word.
    pub(crate) const fn header_offset(self) -> usize {
        self.0 - crate::layout::WORD_SIZE
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sits_one_word_below() {
        let p = Payload::new(48);
        assert_eq!(p.offset(), 48);
        assert_eq!(p.header_offset(), 40);
    }

    #[test]
    fn display_is_hex_offset() {
        assert_eq!(Payload::new(48).to_string(), "0x000030");
    }

    #[test]
    fn into_option_for_nullable_apis() {
        let p: Option<Payload> = Payload::new(16).into();
        assert_eq!(p, Some(Payload::new(16)));
    }
}
