//! Property tests: random operation sequences preserve every heap invariant.

use proptest::prelude::*;
use tagheap_engine::layout::SENTINEL_OVERHEAD;
use tagheap_engine::{Engine, EngineConfig};
use tagheap_test_utils::LiveSet;

#[derive(Clone, Debug)]
enum Op {
    Allocate(usize),
    Release(usize),
    Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..2048).prop_map(Op::Allocate),
        3 => any::<usize>().prop_map(Op::Release),
        2 => (any::<usize>(), 0usize..4096).prop_map(|(i, n)| Op::Resize(i, n)),
    ]
}

fn apply(heap: &mut Engine, live: &mut LiveSet, op: &Op) {
    match *op {
        Op::Allocate(n) => {
            if let Some(p) = heap.allocate(n) {
                live.adopt(heap, p, n);
            }
        }
        Op::Release(i) => {
            if let Some((p, _)) = live.pick(i) {
                live.forget(p);
                heap.release(p);
            }
        }
        Op::Resize(i, n) => {
            let Some((p, old)) = live.pick(i) else {
                return;
            };
            match heap.resize(p, n) {
                Some(q) => {
                    live.forget(p);
                    let kept = n.min(old.requested);
                    assert!(heap.payload(q)[..kept].iter().all(|&b| b == old.pattern));
                    live.adopt(heap, q, n);
                }
                None if n == 0 => {
                    live.forget(p);
                }
                // Failed growth leaves `p` live and intact.
                None => {}
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_workload_preserves_invariants(ops in prop::collection::vec(op(), 1..200)) {
        let mut heap = Engine::init(EngineConfig::new(256 * 1024)).unwrap();
        let mut live = LiveSet::new();

        for op in &ops {
            apply(&mut heap, &mut live, op);
            let stats = heap.validate();
            prop_assert!(stats.is_ok(), "after {:?}: {:?}", op, stats);
            let stats = stats.unwrap();
            prop_assert!(stats.is_balanced());
            prop_assert_eq!(stats.allocated_blocks, live.len());
        }
        live.verify(&heap);

        for p in live.drain() {
            heap.release(p);
        }
        let stats = heap.validate().unwrap();
        prop_assert_eq!(stats.free_blocks, 1);
        prop_assert_eq!(stats.free_bytes, stats.heap_size - SENTINEL_OVERHEAD);
    }

    #[test]
    fn check_is_idempotent(sizes in prop::collection::vec(1usize..512, 1..40)) {
        let mut heap = Engine::init(EngineConfig::new(256 * 1024)).unwrap();
        let ps: Vec<_> = sizes.iter().filter_map(|&n| heap.allocate(n)).collect();
        for p in ps.iter().step_by(3) {
            heap.release(*p);
        }
        let first = heap.check_heap(false);
        let second = heap.check_heap(true);
        prop_assert_eq!(first.violations, second.violations);
        prop_assert_eq!(first.stats, second.stats);
        prop_assert_eq!(first.free_list_len, second.free_list_len);
    }

    #[test]
    fn payloads_aligned_and_large_enough(n in 1usize..10_000) {
        let mut heap = Engine::init(EngineConfig::new(256 * 1024)).unwrap();
        let p = heap.allocate(n).unwrap();
        prop_assert_eq!(p.offset() % 16, 0);
        prop_assert!(heap.usable_size(p) >= n);
        prop_assert_eq!(heap.payload(p).len(), heap.usable_size(p));
    }
}
