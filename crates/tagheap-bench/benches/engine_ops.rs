//! Criterion micro-benchmarks for allocate, release, resize and heap checks.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tagheap_bench::{fragmented_heap, mixed_workload, replay};
use tagheap_engine::{Engine, EngineConfig};

fn fresh() -> Engine {
    Engine::init(EngineConfig::new(16 * 1024 * 1024)).unwrap()
}

/// Allocate and immediately release a small block: the LIFO fast path.
fn bench_small_churn(c: &mut Criterion) {
    let mut engine = fresh();
    c.bench_function("small_churn", |b| {
        b.iter(|| {
            let p = engine.allocate(black_box(24)).unwrap();
            engine.release(p);
        });
    });
}

/// Replay a 10K-step seeded random workload on a fresh heap.
fn bench_mixed_workload(c: &mut Criterion) {
    let steps = mixed_workload(0xC0FFEE, 10_000, 4096);
    c.bench_function("mixed_workload_10k", |b| {
        b.iter_batched(
            fresh,
            |mut engine| black_box(replay(&mut engine, &steps)),
            BatchSize::LargeInput,
        );
    });
}

/// Grow one block through a chain of resizes, copying each time.
fn bench_resize_chain(c: &mut Criterion) {
    c.bench_function("resize_chain", |b| {
        b.iter_batched(
            fresh,
            |mut engine| {
                let mut p = engine.allocate(16).unwrap();
                for n in (32..=16_384).step_by(512) {
                    p = engine.resize(p, n).unwrap();
                }
                engine.release(p);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Full consistency check over 4000 blocks, every other one free.
fn bench_check_fragmented(c: &mut Criterion) {
    let engine = fragmented_heap(4000, 48);
    c.bench_function("check_heap_fragmented", |b| {
        b.iter(|| black_box(engine.check_heap(false)));
    });
}

criterion_group!(
    benches,
    bench_small_churn,
    bench_mixed_workload,
    bench_resize_chain,
    bench_check_fragmented,
);
criterion_main!(benches);
