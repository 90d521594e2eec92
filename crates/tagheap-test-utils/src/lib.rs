//! Test utilities for tagheap development.
//!
//! [`LiveSet`] tracks the blocks a test currently owns, stamps each with a
//! byte pattern, and checks that live blocks never overlap and never lose
//! their contents. [`init_tracing`] routes engine logs to the test writer.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Once;

use indexmap::IndexMap;
use tagheap_engine::{Engine, Payload};
use tracing_subscriber::EnvFilter;

/// Install a `RUST_LOG`-driven subscriber that writes through the test
/// harness. Safe to call from every test.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A live allocation as the test sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Live {
    /// Bytes the test asked for.
    pub requested: usize,
    /// Fill byte written over the requested range.
    pub pattern: u8,
}

/// Blocks currently owned by a test, in allocation order.
#[derive(Debug, Default)]
pub struct LiveSet {
    blocks: IndexMap<Payload, Live>,
    next_pattern: u8,
}

impl LiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Record a fresh allocation and stamp its requested bytes.
    ///
    /// Panics if `p` is already live or overlaps a live block.
    pub fn adopt(&mut self, engine: &mut Engine, p: Payload, requested: usize) {
        assert_eq!(p.offset() % 16, 0, "payload {p} misaligned");
        assert!(
            engine.usable_size(p) >= requested,
            "payload {p} has {} usable bytes, asked for {requested}",
            engine.usable_size(p)
        );
        let pattern = self.bump_pattern();
        engine.payload_mut(p)[..requested].fill(pattern);
        let prev = self.blocks.insert(p, Live { requested, pattern });
        assert!(prev.is_none(), "payload {p} handed out twice");
        self.assert_disjoint(engine);
    }

    /// Forget `p`, returning what was recorded for it.
    pub fn forget(&mut self, p: Payload) -> Option<Live> {
        self.blocks.swap_remove(&p)
    }

    /// The `i`-th live block, wrapping around. `None` when empty.
    pub fn pick(&self, i: usize) -> Option<(Payload, Live)> {
        if self.blocks.is_empty() {
            return None;
        }
        self.blocks
            .get_index(i % self.blocks.len())
            .map(|(&p, &live)| (p, live))
    }

    /// Remove and return every live payload.
    pub fn drain(&mut self) -> Vec<Payload> {
        self.blocks.drain(..).map(|(p, _)| p).collect()
    }

    /// Panic if any live block lost its stamped contents.
    pub fn verify(&self, engine: &Engine) {
        for (&p, live) in &self.blocks {
            let bytes = &engine.payload(p)[..live.requested];
            if let Some(pos) = bytes.iter().position(|&b| b != live.pattern) {
                panic!(
                    "payload {p} byte {pos} is {:#04x}, expected {:#04x}",
                    bytes[pos], live.pattern
                );
            }
        }
    }

    /// Panic if the usable ranges of two live blocks overlap.
    pub fn assert_disjoint(&self, engine: &Engine) {
        let mut spans: Vec<(usize, usize)> = self
            .blocks
            .keys()
            .map(|&p| (p.offset(), p.offset() + engine.usable_size(p)))
            .collect();
        spans.sort_unstable();
        for pair in spans.windows(2) {
            assert!(
                pair[0].1 <= pair[1].0,
                "live blocks overlap: {:#x}..{:#x} and {:#x}..{:#x}",
                pair[0].0,
                pair[0].1,
                pair[1].0,
                pair[1].1
            );
        }
    }

    fn bump_pattern(&mut self) -> u8 {
        // Skip zero so a stamped block is distinguishable from fresh memory.
        self.next_pattern = self.next_pattern.wrapping_add(1).max(1);
        self.next_pattern
    }
}
