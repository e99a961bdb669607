/*!
 * Tracking Allocator
 *
 * `GlobalAlloc` wrapper that feeds every allocation and deallocation into a
 * `MemoryStats` instance. Allocations that would push live bytes past the
 * configured ceiling are refused by returning null, which surfaces through
 * the standard `handle_alloc_error` path.
 *
 * ```ignore
 * use group_runtime::TrackingAllocator;
 *
 * #[global_allocator]
 * static ALLOC: TrackingAllocator = TrackingAllocator::system();
 * ```
 */

use super::stats::MemoryStats;
use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr;

/// Allocation-accounting wrapper around an inner allocator
pub struct TrackingAllocator<A = System> {
    inner: A,
    /// `None` reports into `MemoryStats::global()`
    stats: Option<&'static MemoryStats>,
}

impl TrackingAllocator<System> {
    /// Wrap the system allocator, reporting into the global statistics
    pub const fn system() -> Self {
        Self::new(System)
    }
}

impl<A> TrackingAllocator<A> {
    /// Wrap `inner`, reporting into the global statistics
    pub const fn new(inner: A) -> Self {
        Self { inner, stats: None }
    }

    /// Wrap `inner`, reporting into a caller-provided statistics instance
    pub const fn with_stats(inner: A, stats: &'static MemoryStats) -> Self {
        Self {
            inner,
            stats: Some(stats),
        }
    }

    #[inline]
    pub fn stats(&self) -> &'static MemoryStats {
        self.stats.unwrap_or_else(MemoryStats::global)
    }
}

// SAFETY: every method forwards to the inner allocator with the caller's
// layout; accounting never touches the returned memory.
unsafe impl<A: GlobalAlloc> GlobalAlloc for TrackingAllocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        self.account(ptr, layout)
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        self.account(ptr, layout)
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.stats().record_dealloc(ptr as usize, layout.size());
    }
}

impl<A: GlobalAlloc> TrackingAllocator<A> {
    /// Record a fresh allocation, handing it back to the inner allocator if
    /// the ceiling refuses it
    #[inline]
    unsafe fn account(&self, ptr: *mut u8, layout: Layout) -> *mut u8 {
        if ptr.is_null() {
            return ptr;
        }
        match self.stats().record_alloc(ptr as usize, layout.size()) {
            Ok(()) => ptr,
            Err(_) => {
                self.inner.dealloc(ptr, layout);
                ptr::null_mut()
            }
        }
    }
}
