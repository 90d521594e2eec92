//! First-fit, boundary-tag heap allocator with an explicit free list.
//!
//! The engine manages a single growable [`ArenaRegion`](tagheap_arena::ArenaRegion)
//! and hands out [`Payload`] handles (16-byte aligned byte offsets) in
//! place of raw pointers.
//!
//! ```text
//!  0      8         16            32        40        48
//!  ┌──────┬─────────┬─────────────┬─────────┬─────────┬──────────────── ─ ─ ┬─────────┐
//!  │ pad  │ [32:a]  │ prev │ next │ [32:a]  │ [n:a/f] │ block ...            │ [0:a]   │
//!  └──────┴─────────┴─────────────┴─────────┴─────────┴──────────────── ─ ─ ┴─────────┘
//!          prologue  (free-list sentinel)                                      epilogue
//! ```
//!
//! Every block carries identical header and footer tags so both physical
//! neighbours can be found in constant time. Free blocks additionally
//! thread a circular doubly-linked list through their payloads, anchored
//! at the prologue. Allocation is first-fit over that list; release
//! coalesces immediately with free neighbours.
//!
//! # Quick start
//!
//! ```
//! use tagheap_engine::{Engine, EngineConfig};
//!
//! let mut heap = Engine::init(EngineConfig::new(64 * 1024)).unwrap();
//! let a = heap.allocate(100).unwrap();
//! let b = heap.resize(a, 300).unwrap();
//! heap.release(b);
//! let stats = heap.validate().unwrap();
//! assert_eq!(stats.allocated_blocks, 0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod check;
pub mod config;
pub mod engine;
pub mod error;
mod freelist;
pub mod handle;
pub mod layout;
pub mod stats;
pub mod tag;

pub use check::{CheckMode, HeapReport, Violation};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::HeapError;
pub use handle::Payload;
pub use stats::{BlockInfo, Blocks, EngineCounters, HeapStats};
pub use tag::BlockTag;
