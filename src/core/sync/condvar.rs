/*!
 * Scalable Condition Variable
 *
 * Signal/wait primitive that owns its mutex. Instead of an OS broadcast,
 * each waiter spins on a private slot in a bounded FIFO ring, so a signal
 * wakes exactly one waiter and waiters generate no shared memory traffic.
 *
 * # Semantics
 *
 * - Signals are counted: a `signal()` with nobody waiting is consumed by the
 *   next `wait()`, which then returns immediately
 * - Waiters are released in arrival order
 * - There is no broadcast; call `signal()` once per waiter instead
 */

use super::config::SyncConfig;
use super::locks::{Mutex, RawLock, ScopedLock};
use super::ring::WaitRing;
use super::spinwait::Backoff;
use crate::core::errors::{SyncError, SyncResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// Condition variable with built-in mutex
///
/// `wait` and `signal` must be called while holding the mutex (via `lock`
/// or a `ScopedLock`); otherwise they return `SyncError::NotOwner`.
pub struct ConditionVariable {
    mutex: Mutex,
    /// Outstanding signals; protected by `mutex`
    nsig: AtomicUsize,
    ring: WaitRing,
    config: SyncConfig,
}

impl ConditionVariable {
    /// Create with the default queue capacity
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create with explicit backoff and queue sizing
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            mutex: Mutex::new(),
            nsig: AtomicUsize::new(0),
            ring: WaitRing::new(config.queue_capacity),
            config,
        }
    }

    /// Acquire the associated mutex
    #[inline]
    pub fn lock(&self) -> SyncResult<()> {
        self.mutex.lock()
    }

    /// Try to acquire the associated mutex
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.mutex.try_lock()
    }

    /// Release the associated mutex
    #[inline]
    pub fn unlock(&self) -> SyncResult<()> {
        self.mutex.unlock()
    }

    /// Acquire the associated mutex for the guard's lifetime
    #[inline]
    pub fn scoped(&self) -> SyncResult<ScopedLock<'_, Self>> {
        ScopedLock::new(self)
    }

    /// Wait for a signal
    ///
    /// Consumes an outstanding signal and returns at once if there is one.
    /// Otherwise queues, releases the mutex while spinning, and reacquires it
    /// before returning.
    pub fn wait(&self) -> SyncResult<()> {
        if !self.mutex.is_held_by_current_thread() {
            return Err(SyncError::NotOwner);
        }

        let nsig = self.nsig.load(Ordering::Relaxed);
        if nsig > 0 {
            self.nsig.store(nsig - 1, Ordering::Relaxed);
        } else {
            let ticket = self.ring.enqueue().inspect_err(|e| {
                warn!(error = %e, "Condition variable wait queue full");
            })?;
            self.mutex.unlock()?;
            self.ring
                .wait_for_grant(ticket, &mut Backoff::new(&self.config));
            self.mutex.lock()?;
        }

        self.wakeup();
        Ok(())
    }

    /// Post one signal, releasing the longest waiter if any
    pub fn signal(&self) -> SyncResult<()> {
        if !self.mutex.is_held_by_current_thread() {
            return Err(SyncError::NotOwner);
        }
        self.nsig.fetch_add(1, Ordering::Relaxed);
        self.wakeup();
        Ok(())
    }

    /// Signals posted but not yet consumed
    pub fn pending_signals(&self) -> usize {
        self.nsig.load(Ordering::Relaxed)
    }

    /// Threads currently queued in `wait` (diagnostic, racy)
    pub fn waiters(&self) -> usize {
        self.ring.len()
    }

    /// Transfer outstanding signals to queued waiters; caller holds the mutex
    fn wakeup(&self) {
        let mut nsig = self.nsig.load(Ordering::Relaxed);
        while nsig > 0 {
            let Some(ticket) = self.ring.dequeue() else {
                break;
            };
            nsig -= 1;
            self.ring.grant(ticket);
        }
        self.nsig.store(nsig, Ordering::Relaxed);
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for ConditionVariable {
    fn try_lock(&self) -> bool {
        ConditionVariable::try_lock(self)
    }

    fn lock(&self) -> SyncResult<()> {
        ConditionVariable::lock(self)
    }

    fn unlock(&self) -> SyncResult<()> {
        ConditionVariable::unlock(self)
    }

    fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }

    fn name(&self) -> &'static str {
        "condition_variable"
    }
}
