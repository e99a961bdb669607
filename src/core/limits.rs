/*!
 * Runtime Limits and Constants
 *
 * Centralized location for queue capacities, spin thresholds and reserved
 * identifiers. Performance-critical constants are marked with [PERF].
 */

use std::time::Duration;

use super::types::{GroupId, HandlerId};

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Default number of waiters a fair mutex or condition variable can queue
/// at once
pub const WAIT_QUEUE_CAPACITY: usize = 64;

/// Busy-wait iterations before a waiter starts sleeping between polls
/// [PERF] Keeps uncontended handoff latency in the sub-microsecond range
pub const SPIN_BEFORE_SLEEP: u32 = 1000;

/// Sleep applied per poll once the spin threshold is exhausted
pub const BACKOFF_SLEEP: Duration = Duration::from_micros(1);

// =============================================================================
// MEMORY ACCOUNTING
// =============================================================================

/// Bookkeeping bytes attributed to each live fragment when reporting
pub const MEMORY_OVERHEAD_PER_FRAGMENT: usize = 4 * std::mem::size_of::<usize>() + 16;

// =============================================================================
// PROCESS GROUPS
// =============================================================================

/// Handler that decrements an exported object on its owner
pub const DECREMENT_HANDLER: HandlerId = 0;

/// Handler that increments an exported object on its owner
pub const INCREMENT_HANDLER: HandlerId = 1;

/// First handler id available to client code
pub const FIRST_USER_HANDLER: HandlerId = 16;

/// Group id carried by null references
pub const NULL_GROUP: GroupId = u64::MAX;
