/*!
 * Blocking Mutex
 *
 * OS-blocking mutual exclusion backed by parking_lot's raw mutex (futex on
 * Linux). Tracks the holding thread so relocking and foreign unlocks are
 * reported instead of deadlocking or corrupting the lock.
 */

use super::scoped::ScopedLock;
use super::traits::RawLock;
use crate::core::errors::{SyncError, SyncResult};
use parking_lot::lock_api::RawMutex as RawMutexApi;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) const NO_OWNER: u64 = 0;

static THREAD_TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Non-zero token identifying the current thread
    static THREAD_TOKEN: u64 = THREAD_TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed);
}

/// Token of the calling thread (never `NO_OWNER`)
#[inline]
pub(crate) fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// Non-reentrant blocking mutex
///
/// # Contract
///
/// - `lock` by the current holder returns `SyncError::Reentrant`
/// - `unlock` by a thread that does not hold the mutex returns
///   `SyncError::NotOwner` (or `NotLocked` when nobody holds it)
pub struct Mutex {
    raw: parking_lot::RawMutex,
    owner: AtomicU64,
}

impl Mutex {
    /// Create an unlocked mutex
    pub const fn new() -> Self {
        Self {
            raw: <parking_lot::RawMutex as RawMutexApi>::INIT,
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    /// Try to acquire the mutex; returns immediately
    #[inline]
    pub fn try_lock(&self) -> bool {
        if self.raw.try_lock() {
            self.owner.store(current_thread_token(), Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Acquire the mutex, blocking the thread in the OS if necessary
    #[inline]
    pub fn lock(&self) -> SyncResult<()> {
        let me = current_thread_token();
        // Only this thread can have stored `me`, so a relaxed read is exact.
        if self.owner.load(Ordering::Relaxed) == me {
            return Err(SyncError::Reentrant);
        }
        self.raw.lock();
        self.owner.store(me, Ordering::Relaxed);
        Ok(())
    }

    /// Release a mutex held by the current thread
    #[inline]
    pub fn unlock(&self) -> SyncResult<()> {
        match self.owner.load(Ordering::Relaxed) {
            NO_OWNER => Err(SyncError::NotLocked),
            owner if owner != current_thread_token() => Err(SyncError::NotOwner),
            _ => {
                self.owner.store(NO_OWNER, Ordering::Relaxed);
                // SAFETY: the owner check above proves this thread holds the lock.
                unsafe { self.raw.unlock() };
                Ok(())
            }
        }
    }

    /// Whether the mutex is held by any thread
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Whether the calling thread holds the mutex
    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_token()
    }

    /// Acquire and return a guard that releases on drop
    #[inline]
    pub fn scoped(&self) -> SyncResult<ScopedLock<'_, Self>> {
        ScopedLock::new(self)
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl RawLock for Mutex {
    #[inline]
    fn try_lock(&self) -> bool {
        Mutex::try_lock(self)
    }

    #[inline]
    fn lock(&self) -> SyncResult<()> {
        Mutex::lock(self)
    }

    #[inline]
    fn unlock(&self) -> SyncResult<()> {
        Mutex::unlock(self)
    }

    fn is_locked(&self) -> bool {
        Mutex::is_locked(self)
    }

    fn name(&self) -> &'static str {
        "mutex"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_unlock() {
        let mutex = Mutex::new();
        mutex.lock().unwrap();
        assert!(mutex.is_locked());
        assert!(mutex.is_held_by_current_thread());
        mutex.unlock().unwrap();
        assert!(!mutex.is_locked());
    }

    #[test]
    fn test_relock_reports_reentrancy() {
        let mutex = Mutex::new();
        mutex.lock().unwrap();
        assert_eq!(mutex.lock(), Err(SyncError::Reentrant));
        assert!(!mutex.try_lock());
        mutex.unlock().unwrap();
    }

    #[test]
    fn test_unlock_by_other_thread() {
        let mutex = Arc::new(Mutex::new());
        mutex.lock().unwrap();

        let other = mutex.clone();
        let result = thread::spawn(move || other.unlock()).join().unwrap();
        assert_eq!(result, Err(SyncError::NotOwner));

        assert!(mutex.is_locked());
        mutex.unlock().unwrap();
        assert_eq!(mutex.unlock(), Err(SyncError::NotLocked));
    }

    #[test]
    fn test_thread_tokens_are_distinct() {
        let mine = current_thread_token();
        let theirs = thread::spawn(current_thread_token).join().unwrap();
        assert_ne!(mine, NO_OWNER);
        assert_ne!(mine, theirs);
    }
}
