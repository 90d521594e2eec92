//! Smoke-test driver: two allocations, writes, and a verbose heap check
//! after every step.
//!
//! ```text
//! RUST_LOG=info cargo run --example driver
//! TAGHEAP_STRICT=1 TAGHEAP_CHUNK_SIZE=1024 cargo run --example driver
//! ```

use std::process::ExitCode;

use tagheap::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut heap = match Engine::init(EngineConfig::from_env()) {
        Ok(heap) => heap,
        Err(e) => {
            error!(error = %e, "init failed");
            return ExitCode::FAILURE;
        }
    };
    heap.check_heap(true);

    let (Some(p), Some(q)) = (heap.allocate(8), heap.allocate(1024)) else {
        error!("allocate failed");
        return ExitCode::FAILURE;
    };
    info!(%p, %q, "allocated");
    heap.payload_mut(p)[0] = b'A';
    heap.payload_mut(q)[0] = b'A';

    heap.check_heap(true);
    heap.release(p);
    heap.check_heap(true);
    heap.release(q);
    let report = heap.check_heap(true);

    let heap_size = heap.deinit();
    info!(heap_size, free_bytes = report.stats.free_bytes, "done");
    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
