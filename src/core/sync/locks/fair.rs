/*!
 * Fair Mutex
 *
 * Strictly FIFO mutual exclusion: threads are granted the lock in the order
 * they entered `lock()`. Built from a spinlock protecting a holder count and
 * a bounded ring of per-waiter grant slots; waiters spin on their own slot
 * and the releasing thread hands the lock directly to the front waiter.
 */

use super::mutex::{current_thread_token, NO_OWNER};
use super::spinlock::Spinlock;
use super::traits::RawLock;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::sync::config::SyncConfig;
use crate::core::sync::ring::WaitRing;
use crate::core::sync::spinwait::Backoff;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::warn;

/// FIFO mutex (not reentrant)
///
/// # Contract
///
/// - `lock` by the current holder returns `SyncError::Reentrant`
/// - `unlock` by a thread that does not hold the mutex returns
///   `SyncError::NotOwner` (or `NotLocked` when nobody holds it)
///
/// # Ordering
///
/// No thread can be overtaken by a later arrival. `try_lock` succeeds only
/// when nobody holds or waits for the lock and never joins the queue.
///
/// # Capacity
///
/// At most `SyncConfig::queue_capacity` threads may wait at once; one more
/// returns `SyncError::QueueOverflow` without joining the queue.
pub struct MutexFair {
    guard: Spinlock,
    /// Holder plus queued waiters; protected by `guard`
    n: AtomicUsize,
    /// Token of the holding thread; `NO_OWNER` while a handoff is in flight
    owner: AtomicU64,
    ring: WaitRing,
    config: SyncConfig,
}

impl MutexFair {
    /// Create with the default queue capacity
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create with explicit backoff and queue sizing
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            guard: Spinlock::new(),
            n: AtomicUsize::new(0),
            owner: AtomicU64::new(NO_OWNER),
            ring: WaitRing::new(config.queue_capacity),
            config,
        }
    }

    /// Acquire in arrival order, spinning on a private slot while queued
    pub fn lock(&self) -> SyncResult<()> {
        let me = current_thread_token();
        let ticket = {
            let _guard = self.guard.scoped();
            if self.owner.load(Ordering::Relaxed) == me {
                return Err(SyncError::Reentrant);
            }
            let n = self.n.load(Ordering::Relaxed);
            if n == 0 {
                self.n.store(1, Ordering::Relaxed);
                self.owner.store(me, Ordering::Relaxed);
                None
            } else {
                let ticket = self.ring.enqueue().inspect_err(|e| {
                    warn!(error = %e, waiters = n - 1, "Fair mutex wait queue full");
                })?;
                self.n.store(n + 1, Ordering::Relaxed);
                Some(ticket)
            }
        };

        if let Some(ticket) = ticket {
            self.ring
                .wait_for_grant(ticket, &mut Backoff::new(&self.config));
            self.owner.store(me, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Release, handing the lock to the longest-waiting thread if any
    pub fn unlock(&self) -> SyncResult<()> {
        let next = {
            let _guard = self.guard.scoped();
            let n = self.n.load(Ordering::Relaxed);
            if n == 0 {
                return Err(SyncError::NotLocked);
            }
            if self.owner.load(Ordering::Relaxed) != current_thread_token() {
                return Err(SyncError::NotOwner);
            }
            self.owner.store(NO_OWNER, Ordering::Relaxed);
            self.n.store(n - 1, Ordering::Relaxed);
            self.ring.dequeue()
        };

        // Wake outside the spinlock so the successor never contends on it.
        if let Some(ticket) = next {
            self.ring.grant(ticket);
        }
        Ok(())
    }

    /// Acquire only if nobody holds or waits for the lock
    pub fn try_lock(&self) -> bool {
        let _guard = self.guard.scoped();
        if self.n.load(Ordering::Relaxed) == 0 {
            self.n.store(1, Ordering::Relaxed);
            self.owner.store(current_thread_token(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Whether the lock is held
    pub fn is_locked(&self) -> bool {
        self.n.load(Ordering::Relaxed) > 0
    }

    /// Whether the calling thread holds the lock
    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_token()
    }

    /// Number of threads queued behind the holder (diagnostic, racy)
    pub fn waiters(&self) -> usize {
        self.ring.len()
    }

    /// Maximum number of queued waiters
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl Default for MutexFair {
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for MutexFair {
    fn try_lock(&self) -> bool {
        MutexFair::try_lock(self)
    }

    fn lock(&self) -> SyncResult<()> {
        MutexFair::lock(self)
    }

    fn unlock(&self) -> SyncResult<()> {
        MutexFair::unlock(self)
    }

    fn is_locked(&self) -> bool {
        MutexFair::is_locked(self)
    }

    fn name(&self) -> &'static str {
        "mutex_fair"
    }
}
