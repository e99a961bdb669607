/*!
 * Synchronization Configuration
 *
 * Backoff and wait-queue sizing shared by the busy-waiting primitives
 */

use crate::core::limits::{BACKOFF_SLEEP, SPIN_BEFORE_SLEEP, WAIT_QUEUE_CAPACITY};
use std::time::Duration;

/// Synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Busy-wait iterations before each poll starts sleeping
    pub spin_threshold: u32,
    /// Sleep per poll once `spin_threshold` is exhausted
    pub backoff_sleep: Duration,
    /// Maximum queued waiters for `MutexFair` and `ConditionVariable`
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncConfig {
    /// Runtime defaults (usable in const contexts)
    pub const fn new() -> Self {
        Self {
            spin_threshold: SPIN_BEFORE_SLEEP,
            backoff_sleep: BACKOFF_SLEEP,
            queue_capacity: WAIT_QUEUE_CAPACITY,
        }
    }

    /// Configuration for short critical sections where wakeup latency matters
    /// more than CPU burn
    pub const fn low_latency() -> Self {
        Self {
            spin_threshold: 20_000,
            backoff_sleep: Duration::from_micros(1),
            queue_capacity: WAIT_QUEUE_CAPACITY,
        }
    }

    /// Configuration for oversubscribed hosts: sleep early, sleep longer
    pub const fn low_cpu() -> Self {
        Self {
            spin_threshold: 64,
            backoff_sleep: Duration::from_micros(50),
            queue_capacity: WAIT_QUEUE_CAPACITY,
        }
    }

    /// Override the wait-queue capacity
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_limits() {
        let config = SyncConfig::default();
        assert_eq!(config.spin_threshold, SPIN_BEFORE_SLEEP);
        assert_eq!(config.backoff_sleep, BACKOFF_SLEEP);
        assert_eq!(config.queue_capacity, WAIT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_presets_differ() {
        assert!(SyncConfig::low_latency().spin_threshold > SyncConfig::low_cpu().spin_threshold);
        assert_eq!(SyncConfig::new().with_queue_capacity(8).queue_capacity, 8);
    }
}
