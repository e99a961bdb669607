/*!
 * Lock Family
 *
 * Mutual-exclusion primitives for threads inside one process:
 * - Spinlock (busy-wait building block)
 * - Mutex (OS-blocking, owner-checked)
 * - MutexFair (strict FIFO handoff)
 * - MutexReaderWriter (shared/exclusive with conversion)
 * - ScopedLock (RAII guard over any of the above)
 */

mod fair;
mod mutex;
mod rwlock;
mod scoped;
mod spinlock;
mod traits;

// Re-export public API
pub use fair::MutexFair;
pub use mutex::Mutex;
pub use rwlock::{LockMode, ModeGuard, MutexReaderWriter};
pub use scoped::{try_two_locks, ScopedLock};
pub use spinlock::Spinlock;
pub use traits::RawLock;
