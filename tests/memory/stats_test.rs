/*!
 * Memory Statistics Tests
 * Counter invariants, ceiling enforcement and the global instance
 */

use group_runtime::{MemoryConfig, MemoryError, MemoryStats, MemoryStatsSnapshot};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serial_test::serial;
use std::sync::Arc;
use std::thread;

proptest! {
    #[test]
    fn prop_matched_sequence_returns_to_zero(
        sizes in prop::collection::vec(1usize..4096, 1..64),
        seed in any::<u64>(),
    ) {
        let stats = MemoryStats::new();
        let mut live: Vec<(usize, usize)> = Vec::new();
        let mut live_bytes = 0usize;
        let mut max_bytes = 0usize;
        let mut max_frags = 0usize;
        let mut last_peak_bytes = 0usize;
        let mut order = seed;

        // Interleave allocations with frees chosen from the seed bits
        for (i, &size) in sizes.iter().enumerate() {
            stats.record_alloc(0x1000 + i * 8, size).unwrap();
            live.push((0x1000 + i * 8, size));
            live_bytes += size;
            max_bytes = max_bytes.max(live_bytes);
            max_frags = max_frags.max(live.len());

            if order & 1 == 1 {
                let (addr, size) = live.remove(0);
                stats.record_dealloc(addr, size);
                live_bytes -= size;
            }
            order = order.rotate_right(1);

            let peak = stats.snapshot().peak_bytes;
            prop_assert!(peak >= last_peak_bytes);
            last_peak_bytes = peak;
        }
        for (addr, size) in live.drain(..) {
            stats.record_dealloc(addr, size);
        }

        let snapshot = stats.snapshot();
        prop_assert_eq!(snapshot.live_fragments, 0);
        prop_assert_eq!(snapshot.live_bytes, 0);
        prop_assert_eq!(snapshot.alloc_calls, sizes.len() as u64);
        prop_assert_eq!(snapshot.dealloc_calls, sizes.len() as u64);
        prop_assert_eq!(snapshot.peak_bytes, max_bytes);
        prop_assert_eq!(snapshot.peak_fragments, max_frags);
    }

    #[test]
    fn prop_ceiling_is_exact(ceiling in 0usize..10_000, request in 0usize..20_000) {
        let stats = MemoryStats::new();
        stats.set_ceiling(Some(ceiling));
        let result = stats.record_alloc(0x10, request);
        if request <= ceiling {
            prop_assert!(result.is_ok());
            prop_assert_eq!(stats.snapshot().live_bytes, request);
        } else {
            prop_assert_eq!(
                result,
                Err(MemoryError::CeilingExceeded { requested: request, live: 0, ceiling })
            );
            prop_assert_eq!(stats.snapshot().live_bytes, 0);
            prop_assert_eq!(stats.snapshot().alloc_calls, 0);
        }
    }
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10_000;
    let stats = Arc::new(MemoryStats::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let addr = (t << 32) | i;
                    stats.record_alloc(addr, 16).unwrap();
                    stats.record_dealloc(addr, 16);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.alloc_calls, (THREADS * PER_THREAD) as u64);
    assert_eq!(snapshot.dealloc_calls, (THREADS * PER_THREAD) as u64);
    assert_eq!(snapshot.live_bytes, 0);
    assert!(snapshot.peak_bytes >= 16 && snapshot.peak_bytes <= 16 * THREADS);
}

#[test]
fn test_snapshot_serializes() {
    let stats = MemoryStats::new();
    stats.record_alloc(0x10, 100).unwrap();
    let snapshot = stats.snapshot();

    let bytes = group_runtime::core::bincode::to_vec(&snapshot).unwrap();
    let back: MemoryStatsSnapshot = group_runtime::core::bincode::from_slice(&bytes).unwrap();
    assert_eq!(snapshot, back);
    stats.print();
}

#[test]
#[serial]
fn test_global_config_from_env() {
    std::env::set_var("GROUP_RUNTIME_MEM_LIMIT", "65536");
    std::env::set_var("GROUP_RUNTIME_MEM_TRACE", "true");
    let config = MemoryConfig::from_env();
    std::env::remove_var("GROUP_RUNTIME_MEM_LIMIT");
    std::env::remove_var("GROUP_RUNTIME_MEM_TRACE");

    assert_eq!(config, MemoryConfig::new().with_ceiling(65536).with_trace(true));

    let global = MemoryStats::global();
    config.apply(global);
    assert_eq!(global.ceiling(), Some(65536));
    assert!(global.is_tracing());

    MemoryConfig::default().apply(global);
    assert_eq!(global.ceiling(), None);
}

#[test]
#[serial]
fn test_invalid_env_limit_is_ignored() {
    std::env::set_var("GROUP_RUNTIME_MEM_LIMIT", "lots");
    let config = MemoryConfig::from_env();
    std::env::remove_var("GROUP_RUNTIME_MEM_LIMIT");
    assert_eq!(config.ceiling, None);
}
