//! Fixed-ceiling byte arena with `sbrk`-style growth.
//!
//! This crate is the "virtual memory" collaborator of the tagheap
//! allocator. It reserves a fixed ceiling up front and hands out
//! monotonically increasing byte ranges below it. Every "address" is a
//! byte offset into one owned buffer, so the allocator built on top never
//! needs raw pointers.
//!
//! # Architecture
//!
//! ```text
//! ArenaRegion
//! ├── data: Vec<u8>   (len == brk, capacity == reserved)
//! └── reserved        (fixed ceiling, never exceeded)
//!
//! 0                         brk                    reserved
//! ├─────── formatted ───────┼──────── untouched ───────┤
//! ```
//!
//! The arena never shrinks. Bytes below the mark are owned by whoever
//! extended the arena; the region itself attaches no meaning to them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod region;

pub use config::ArenaConfig;
pub use error::ArenaError;
pub use region::{ArenaRegion, WORD_SIZE};
