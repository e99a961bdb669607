/*!
 * Adaptive Backoff
 *
 * Spin-then-sleep waiter used by every busy-wait path in the lock family.
 * Spins with a CPU relax hint up to a fixed iteration threshold, then sleeps
 * briefly on each further poll to bound CPU burn under contention.
 */

use super::config::SyncConfig;
use crate::core::hints::cpu_relax;
use std::thread;
use std::time::Duration;

/// Adaptive spin-then-sleep waiter
///
/// # Performance
///
/// - Sub-microsecond reaction while under the spin threshold
/// - Bounded CPU usage for long waits (one short sleep per poll)
/// - No allocation, no OS wait queue
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    count: u32,
    spin_threshold: u32,
    sleep: Duration,
}

impl Backoff {
    /// Create a backoff from a sync configuration
    #[inline]
    pub const fn new(config: &SyncConfig) -> Self {
        Self {
            count: 0,
            spin_threshold: config.spin_threshold,
            sleep: config.backoff_sleep,
        }
    }

    /// Create with default parameters
    #[inline]
    pub const fn with_defaults() -> Self {
        Self::new(&SyncConfig::new())
    }

    /// Perform one wait step
    #[inline]
    pub fn wait(&mut self) {
        if self.count < self.spin_threshold {
            self.count += 1;
            cpu_relax();
        } else {
            thread::sleep(self.sleep);
        }
    }

    /// Restart the spin phase
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// True once the spin budget is exhausted and polls sleep
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.count >= self.spin_threshold
    }

    /// Wait until `done` returns true
    #[inline]
    pub fn wait_until(&mut self, mut done: impl FnMut() -> bool) {
        while !done() {
            self.wait();
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::with_defaults()
    }
}
