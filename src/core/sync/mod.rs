/*!
 * Synchronization Primitives
 *
 * Intra-process coordination for the runtime. Cross-process coordination
 * never goes through these types; it uses one-way messages (see `world`).
 *
 * # Waiting model
 *
 * - `Mutex` blocks in the OS (futex on Linux)
 * - `Spinlock`, `MutexFair`, `ConditionVariable` and the reader/writer lock
 *   busy-wait with adaptive backoff to minimise wakeup latency
 * - `BlockingConditionVariable` is available when waiting must not burn CPU
 *
 * None of the primitives support timeouts or cancellation.
 *
 * # Fairness
 *
 * `MutexFair` and `ConditionVariable` grant in arrival order. The plain
 * locks and the reader/writer lock make no fairness guarantee.
 */

mod blocking;
mod condvar;
mod config;
pub mod locks;
mod ring;
mod spinwait;

pub use blocking::BlockingConditionVariable;
pub use condvar::ConditionVariable;
pub use config::SyncConfig;
pub use locks::{
    try_two_locks, LockMode, ModeGuard, Mutex, MutexFair, MutexReaderWriter, RawLock, ScopedLock,
    Spinlock,
};
pub use spinwait::Backoff;
