/*!
 * Lock Traits
 *
 * Common acquire/release surface so guards and helpers are written once for
 * every lock in the family.
 */

use crate::core::errors::SyncResult;

/// Raw mutual-exclusion lock
///
/// Implementations must be:
/// - **Non-blocking in `try_lock`**: returns immediately
/// - **Non-reentrant**: a holder calling `lock` again either errors or deadlocks
/// - **Checked on release**: `unlock` by a thread that does not hold the lock
///   returns an error where the implementation can detect it
pub trait RawLock: Send + Sync {
    /// Try to acquire without waiting
    fn try_lock(&self) -> bool;

    /// Acquire, waiting if necessary
    fn lock(&self) -> SyncResult<()>;

    /// Release a lock held by the caller
    fn unlock(&self) -> SyncResult<()>;

    /// Whether the lock is currently held by anyone (diagnostic, racy)
    fn is_locked(&self) -> bool;

    /// Lock name for logging
    fn name(&self) -> &'static str;
}
