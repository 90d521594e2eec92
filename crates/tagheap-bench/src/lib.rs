//! Workload generators for benchmarking the tagheap allocator.
//!
//! - [`mixed_workload`]: seeded random mix of allocate, release and resize
//! - [`fragmented_heap`]: a heap with alternating live and free blocks
//! - [`replay`]: drive an [`Engine`] through a generated workload

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tagheap_engine::{Engine, EngineConfig, Payload};

/// One step of a generated workload.
///
/// Slot indices refer to the live set at replay time and wrap around.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Allocate this many bytes.
    Allocate(usize),
    /// Release the block in this slot.
    Release(usize),
    /// Resize the block in this slot to this many bytes.
    Resize(usize, usize),
}

/// Generate `len` steps, weighted 5:4:1 towards allocation, with request
/// sizes skewed small (most under 128 bytes, a few up to `max_size`).
///
/// The same seed always yields the same workload.
pub fn mixed_workload(seed: u64, len: usize, max_size: usize) -> Vec<Step> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let size = move |rng: &mut ChaCha8Rng| {
        if rng.random_range(0..10) < 8 {
            rng.random_range(1..=128)
        } else {
            rng.random_range(1..=max_size.max(1))
        }
    };

    (0..len)
        .map(|_| match rng.random_range(0..10) {
            0..=4 => Step::Allocate(size(&mut rng)),
            5..=8 => Step::Release(rng.random_range(0..usize::MAX)),
            _ => {
                let slot = rng.random_range(0..usize::MAX);
                Step::Resize(slot, size(&mut rng))
            }
        })
        .collect()
}

/// Run `steps` against `engine`, returning the blocks still live.
///
/// Failed allocations are skipped.
pub fn replay(engine: &mut Engine, steps: &[Step]) -> Vec<Payload> {
    let mut live: Vec<Payload> = Vec::new();
    for &step in steps {
        match step {
            Step::Allocate(n) => live.extend(engine.allocate(n)),
            Step::Release(slot) if !live.is_empty() => {
                let p = live.swap_remove(slot % live.len());
                engine.release(p);
            }
            Step::Resize(slot, n) if !live.is_empty() => {
                let i = slot % live.len();
                if let Some(q) = engine.resize(live[i], n) {
                    live[i] = q;
                }
            }
            Step::Release(_) | Step::Resize(..) => {}
        }
    }
    live
}

/// A heap holding `blocks` allocations of `size` bytes with every other
/// one released, so free and allocated blocks alternate.
pub fn fragmented_heap(blocks: usize, size: usize) -> Engine {
    let config = EngineConfig::new(64 * 1024 * 1024);
    let mut engine = Engine::init(config).expect("benchmark heap config is valid");
    let ps: Vec<_> = (0..blocks).filter_map(|_| engine.allocate(size)).collect();
    for &p in ps.iter().step_by(2) {
        engine.release(p);
    }
    engine
}
