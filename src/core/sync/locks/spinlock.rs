/*!
 * Spinlock
 *
 * Busy-wait mutual exclusion. Never allocates and never sleeps in the OS
 * scheduler until the backoff spin budget is spent, which makes it the
 * building block for the fair mutex and the reader/writer lock.
 */

use super::scoped::ScopedLock;
use super::traits::RawLock;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::hints::{likely, unlikely};
use crate::core::sync::spinwait::Backoff;
use std::sync::atomic::{AtomicBool, Ordering};

/// Test-and-test-and-set spinlock
///
/// # Performance
///
/// - Uncontended acquire is a single CAS
/// - Waiters poll with relaxed loads so the cache line stays shared
/// - Cache-line aligned to prevent false sharing with neighbouring data
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct Spinlock {
    locked: AtomicBool,
}

impl Spinlock {
    /// Create an unlocked spinlock
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Try to acquire the spinlock; returns immediately
    #[inline]
    pub fn try_lock(&self) -> bool {
        !self.locked.load(Ordering::Relaxed)
            && self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Acquire the spinlock, spinning with backoff
    #[inline]
    pub fn lock(&self) {
        if likely(self.try_lock()) {
            return;
        }
        self.lock_contended();
    }

    #[cold]
    fn lock_contended(&self) {
        let mut backoff = Backoff::with_defaults();
        loop {
            while self.locked.load(Ordering::Relaxed) {
                backoff.wait();
            }
            if self.try_lock() {
                return;
            }
        }
    }

    /// Release the spinlock
    ///
    /// Returns `NotLocked` if the spinlock was not held.
    #[inline]
    pub fn unlock(&self) -> SyncResult<()> {
        if unlikely(!self.locked.swap(false, Ordering::Release)) {
            return Err(SyncError::NotLocked);
        }
        Ok(())
    }

    /// Whether the spinlock is currently held
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Acquire and return a guard that releases on drop
    #[inline]
    pub fn scoped(&self) -> ScopedLock<'_, Self> {
        self.lock();
        ScopedLock::adopt(self)
    }
}

impl RawLock for Spinlock {
    #[inline]
    fn try_lock(&self) -> bool {
        Spinlock::try_lock(self)
    }

    #[inline]
    fn lock(&self) -> SyncResult<()> {
        Spinlock::lock(self);
        Ok(())
    }

    #[inline]
    fn unlock(&self) -> SyncResult<()> {
        Spinlock::unlock(self)
    }

    fn is_locked(&self) -> bool {
        Spinlock::is_locked(self)
    }

    fn name(&self) -> &'static str {
        "spinlock"
    }
}
