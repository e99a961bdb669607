/*!
 * Tracking Allocator Tests
 * Accounting and ceiling refusal through the GlobalAlloc interface
 */

use group_runtime::{MemoryStats, TrackingAllocator};
use std::alloc::{GlobalAlloc, Layout, System};

#[test]
fn test_ceiling_refuses_allocation() {
    static STATS: MemoryStats = MemoryStats::new();
    let alloc = TrackingAllocator::with_stats(System, &STATS);
    STATS.set_ceiling(Some(1024));

    let small = Layout::from_size_align(512, 16).unwrap();
    let large = Layout::from_size_align(600, 16).unwrap();

    unsafe {
        let first = alloc.alloc(small);
        assert!(!first.is_null());

        // 512 + 600 > 1024
        assert!(alloc.alloc(large).is_null());
        let snapshot = STATS.snapshot();
        assert_eq!(snapshot.live_bytes, 512);
        assert_eq!(snapshot.alloc_calls, 1);

        // 512 + 512 == 1024 is allowed
        let second = alloc.alloc(small);
        assert!(!second.is_null());

        alloc.dealloc(first, small);
        alloc.dealloc(second, small);
    }

    let snapshot = STATS.snapshot();
    assert_eq!(snapshot.live_bytes, 0);
    assert_eq!(snapshot.live_fragments, 0);
    assert_eq!(snapshot.peak_bytes, 1024);
    assert_eq!(snapshot.peak_fragments, 2);
}

#[test]
fn test_realloc_is_accounted() {
    static STATS: MemoryStats = MemoryStats::new();
    let alloc = TrackingAllocator::with_stats(System, &STATS);
    let layout = Layout::from_size_align(64, 8).unwrap();

    unsafe {
        let ptr = alloc.alloc(layout);
        assert!(!ptr.is_null());
        ptr.write_bytes(0xAB, 64);

        let grown = alloc.realloc(ptr, layout, 256);
        assert!(!grown.is_null());
        assert_eq!(*grown.add(63), 0xAB);
        assert_eq!(STATS.snapshot().live_bytes, 256);

        alloc.dealloc(grown, Layout::from_size_align(256, 8).unwrap());
    }

    let snapshot = STATS.snapshot();
    assert_eq!(snapshot.live_bytes, 0);
    assert_eq!(snapshot.alloc_calls, 2);
    assert_eq!(snapshot.dealloc_calls, 2);
}

#[test]
fn test_trace_does_not_recurse() {
    static STATS: MemoryStats = MemoryStats::new();
    let alloc = TrackingAllocator::with_stats(System, &STATS);
    STATS.set_trace(true);
    group_runtime::init_tracing();

    let layout = Layout::from_size_align(32, 8).unwrap();
    unsafe {
        let ptr = alloc.alloc(layout);
        assert!(!ptr.is_null());
        alloc.dealloc(ptr, layout);
    }
    assert_eq!(STATS.snapshot().alloc_calls, 1);
}
