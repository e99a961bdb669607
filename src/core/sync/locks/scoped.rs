/*!
 * Scoped Lock Guard
 *
 * RAII guard that holds a lock from construction until drop, on every exit
 * path including early return and unwinding.
 */

use super::traits::RawLock;
use crate::core::errors::SyncResult;
use tracing::error;

/// Lock held for the lifetime of the guard
///
/// # Example
///
/// ```
/// use group_runtime::{Mutex, ScopedLock};
///
/// let mutex = Mutex::new();
/// {
///     let _guard = ScopedLock::new(&mutex).unwrap();
///     assert!(mutex.is_locked());
/// }
/// assert!(!mutex.is_locked());
/// ```
#[must_use = "dropping the guard releases the lock immediately"]
pub struct ScopedLock<'a, L: RawLock + ?Sized> {
    lock: &'a L,
}

impl<'a, L: RawLock + ?Sized> ScopedLock<'a, L> {
    /// Acquire `lock`, waiting if necessary
    #[inline]
    pub fn new(lock: &'a L) -> SyncResult<Self> {
        lock.lock()?;
        Ok(Self { lock })
    }

    /// Acquire `lock` only if it is immediately available
    #[inline]
    pub fn try_new(lock: &'a L) -> Option<Self> {
        lock.try_lock().then(|| Self { lock })
    }

    /// Wrap a lock the caller has already acquired
    #[inline]
    pub(crate) fn adopt(lock: &'a L) -> Self {
        Self { lock }
    }

    /// The guarded lock
    #[inline]
    pub fn lock(&self) -> &'a L {
        self.lock
    }
}

impl<L: RawLock + ?Sized> Drop for ScopedLock<'_, L> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            error!(lock = self.lock.name(), error = %e, "Scoped lock release failed");
        }
    }
}

/// Acquire two locks without blocking while holding either one
///
/// Tries `first`, then `second`; if `second` is unavailable, `first` is
/// released again and `false` is returned.
pub fn try_two_locks<A, B>(first: &A, second: &B) -> bool
where
    A: RawLock + ?Sized,
    B: RawLock + ?Sized,
{
    if !first.try_lock() {
        return false;
    }
    if second.try_lock() {
        return true;
    }
    if let Err(e) = first.unlock() {
        error!(lock = first.name(), error = %e, "Release after failed second acquire failed");
    }
    false
}
