//! tagheap: a first-fit, boundary-tag heap allocator with an explicit free
//! list, running over a fixed-ceiling, sbrk-style arena.
//!
//! This is the facade crate that re-exports the public API of the tagheap
//! sub-crates. For most users, adding `tagheap` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tagheap::prelude::*;
//!
//! let mut heap = Engine::init(EngineConfig::new(64 * 1024)).unwrap();
//!
//! let p = heap.allocate(8).unwrap();
//! let q = heap.allocate(1024).unwrap();
//! heap.payload_mut(p)[0] = b'A';
//! heap.payload_mut(q)[0] = b'A';
//!
//! heap.release(p);
//! heap.release(q);
//!
//! let report = heap.check_heap(false);
//! assert!(report.is_ok());
//! assert_eq!(report.stats.free_blocks, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `tagheap-arena` | `ArenaRegion`, the growable byte region, and its config |
//! | [`engine`] | `tagheap-engine` | The allocator, boundary tags, heap checker, statistics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Fixed-ceiling byte arena (`tagheap-arena`).
///
/// The engine owns its region; use this module for [`arena::ArenaConfig`]
/// and for reading the region through [`Engine::arena`](engine::Engine::arena).
pub use tagheap_arena as arena;

/// Allocator engine (`tagheap-engine`).
///
/// Provides [`engine::Engine`] plus the block-level types used to inspect
/// a heap: [`engine::BlockTag`], [`engine::HeapStats`], [`engine::Violation`].
pub use tagheap_engine as engine;

/// Common imports for typical tagheap usage.
///
/// ```rust
/// use tagheap::prelude::*;
/// ```
pub mod prelude {
    // Arena
    pub use tagheap_arena::{ArenaConfig, ArenaError};

    // Engine
    pub use tagheap_engine::{CheckMode, Engine, EngineConfig, HeapError, Payload};

    // Inspection
    pub use tagheap_engine::{BlockInfo, BlockTag, HeapReport, HeapStats, Violation};
}
