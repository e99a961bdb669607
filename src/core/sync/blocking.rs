/*!
 * Blocking Condition Variable
 *
 * OS-blocking counterpart of `ConditionVariable` for callers that must wait
 * without consuming cycles. Scheduling granularity is the OS wakeup latency.
 */

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Condition variable bundled with the state it protects
pub struct BlockingConditionVariable<T> {
    state: Mutex<T>,
    cond: Condvar,
}

impl<T> BlockingConditionVariable<T> {
    /// Create around an initial state
    pub fn new(state: T) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    /// Acquire the state mutex
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock()
    }

    /// Block until signalled; the guard is released while blocked
    #[inline]
    pub fn wait(&self, guard: &mut MutexGuard<'_, T>) {
        self.cond.wait(guard);
    }

    /// Block while `condition` holds, re-checking after every wakeup
    #[inline]
    pub fn wait_while<F>(&self, guard: &mut MutexGuard<'_, T>, condition: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        self.cond.wait_while(guard, condition);
    }

    /// Wake one blocked thread; returns whether one was woken
    #[inline]
    pub fn signal(&self) -> bool {
        self.cond.notify_one()
    }

    /// Wake every blocked thread; returns how many were woken
    #[inline]
    pub fn broadcast(&self) -> usize {
        self.cond.notify_all()
    }

    /// Consume and return the protected state
    pub fn into_inner(self) -> T {
        self.state.into_inner()
    }
}

impl<T: Default> Default for BlockingConditionVariable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
