/*!
 * Allocation Accounting
 *
 * Process-wide allocation counters updated on every allocation and
 * deallocation. All counters are independent atomics on their own cache
 * lines, so the allocator hot path never takes a lock and never allocates.
 *
 * ## Counters
 * - Call counters only ever increase
 * - Live fragment/byte counters return to zero when every allocation is paired
 *   with a deallocation
 * - Peak counters are high-water marks and never decrease (until `reset`)
 * - An optional byte ceiling makes allocations fail fast once exceeded
 */

use super::types::{MemoryError, MemoryResult, MemoryStatsSnapshot};
use crate::core::hints::unlikely;
use crate::core::types::{Address, Size};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::info;

const NO_CEILING: usize = usize::MAX;

/// Cache-line padded counter
#[repr(C, align(64))]
struct PaddedUsize(AtomicUsize);

#[repr(C, align(64))]
struct PaddedU64(AtomicU64);

static GLOBAL_STATS: MemoryStats = MemoryStats::new();

thread_local! {
    /// Set while this thread is emitting a trace line, so allocations made
    /// by the subscriber are not traced recursively
    static IN_TRACE: Cell<bool> = const { Cell::new(false) };
}

/// Allocation statistics
pub struct MemoryStats {
    alloc_calls: PaddedU64,
    dealloc_calls: PaddedU64,
    live_fragments: PaddedUsize,
    peak_fragments: PaddedUsize,
    live_bytes: PaddedUsize,
    peak_bytes: PaddedUsize,
    ceiling: AtomicUsize,
    trace: AtomicBool,
}

impl MemoryStats {
    /// Create an independent, zeroed set of counters with no ceiling
    pub const fn new() -> Self {
        Self {
            alloc_calls: PaddedU64(AtomicU64::new(0)),
            dealloc_calls: PaddedU64(AtomicU64::new(0)),
            live_fragments: PaddedUsize(AtomicUsize::new(0)),
            peak_fragments: PaddedUsize(AtomicUsize::new(0)),
            live_bytes: PaddedUsize(AtomicUsize::new(0)),
            peak_bytes: PaddedUsize(AtomicUsize::new(0)),
            ceiling: AtomicUsize::new(NO_CEILING),
            trace: AtomicBool::new(false),
        }
    }

    /// The process-wide instance fed by `TrackingAllocator`
    #[inline]
    pub fn global() -> &'static MemoryStats {
        &GLOBAL_STATS
    }

    /// Record an allocation of `size` bytes at `addr`
    ///
    /// Fails without touching any counter if `live_bytes + size` would exceed
    /// the ceiling or overflow `usize`.
    #[inline]
    pub fn record_alloc(&self, addr: Address, size: Size) -> MemoryResult<()> {
        let ceiling = self.ceiling.load(Ordering::Relaxed);
        let previous = self
            .live_bytes
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| {
                live.checked_add(size).filter(|&next| next <= ceiling)
            })
            .map_err(|live| MemoryError::CeilingExceeded {
                requested: size,
                live,
                ceiling,
            })?;
        let live = previous + size;

        self.alloc_calls.0.fetch_add(1, Ordering::Relaxed);
        let fragments = self.live_fragments.0.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_fragments.0.fetch_max(fragments, Ordering::Relaxed);
        self.peak_bytes.0.fetch_max(live, Ordering::Relaxed);

        if unlikely(self.trace.load(Ordering::Relaxed)) {
            trace_event("allocating", addr, size);
        }
        Ok(())
    }

    /// Record a deallocation of `size` bytes at `addr`
    ///
    /// Live counters saturate at zero, so frees of memory allocated before a
    /// `reset` cannot wrap them.
    #[inline]
    pub fn record_dealloc(&self, addr: Address, size: Size) {
        self.dealloc_calls.0.fetch_add(1, Ordering::Relaxed);
        saturating_sub(&self.live_fragments.0, 1);
        saturating_sub(&self.live_bytes.0, size);

        if unlikely(self.trace.load(Ordering::Relaxed)) {
            trace_event("deleting", addr, size);
        }
    }

    /// Unlocked copy of every counter (best effort under concurrent updates)
    pub fn snapshot(&self) -> MemoryStatsSnapshot {
        MemoryStatsSnapshot {
            alloc_calls: self.alloc_calls.0.load(Ordering::Relaxed),
            dealloc_calls: self.dealloc_calls.0.load(Ordering::Relaxed),
            live_fragments: self.live_fragments.0.load(Ordering::Relaxed),
            peak_fragments: self.peak_fragments.0.load(Ordering::Relaxed),
            live_bytes: self.live_bytes.0.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.0.load(Ordering::Relaxed),
            ceiling: self.ceiling(),
            trace: self.is_tracing(),
        }
    }

    /// Log the snapshot table
    pub fn print(&self) {
        info!("\n{}", self.snapshot());
    }

    /// Zero every counter; the ceiling and trace flag are kept
    pub fn reset(&self) {
        self.alloc_calls.0.store(0, Ordering::Relaxed);
        self.dealloc_calls.0.store(0, Ordering::Relaxed);
        self.live_fragments.0.store(0, Ordering::Relaxed);
        self.peak_fragments.0.store(0, Ordering::Relaxed);
        self.live_bytes.0.store(0, Ordering::Relaxed);
        self.peak_bytes.0.store(0, Ordering::Relaxed);
    }

    /// Set or clear the live-byte ceiling
    pub fn set_ceiling(&self, ceiling: Option<Size>) {
        self.ceiling
            .store(ceiling.unwrap_or(NO_CEILING), Ordering::Relaxed);
    }

    /// Current live-byte ceiling
    pub fn ceiling(&self) -> Option<Size> {
        match self.ceiling.load(Ordering::Relaxed) {
            NO_CEILING => None,
            ceiling => Some(ceiling),
        }
    }

    /// Emit a trace line for every allocation and deallocation
    pub fn set_trace(&self, trace: bool) {
        self.trace.store(trace, Ordering::Relaxed);
    }

    pub fn is_tracing(&self) -> bool {
        self.trace.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStats {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn saturating_sub(counter: &AtomicUsize, delta: usize) {
    // Closure never returns None, so the update cannot fail.
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_sub(delta))
    });
}

#[cold]
fn trace_event(action: &'static str, addr: Address, size: Size) {
    let _ = IN_TRACE.try_with(|busy| {
        if busy.replace(true) {
            return;
        }
        info!(action, addr = format_args!("{:#x}", addr), size, "Memory trace");
        busy.set(false);
    });
}
