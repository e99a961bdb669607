/*!
 * Waiter Ring
 *
 * Bounded circular queue of per-waiter grant slots shared by the fair mutex
 * and the condition variable. Each waiter polls only its own cache-line
 * aligned slot, so waiting generates no traffic on the lock's state.
 *
 * # Design
 *
 * Waiters are identified by monotonically increasing tickets. Ticket `t`
 * lives in slot `t % capacity`; granting stores `t + 1` into that slot. Slot
 * values only ever grow, so a waiter whose grant was overwritten by a later
 * ticket reusing the slot still observes itself as granted.
 *
 * `enqueue`/`dequeue` must be called under the owning primitive's lock;
 * `grant` and `wait_for_grant` are safe without it.
 */

use super::spinwait::Backoff;
use crate::core::errors::{SyncError, SyncResult};
use std::sync::atomic::{AtomicU64, Ordering};

#[repr(C, align(64))]
struct WaitSlot {
    grant: AtomicU64,
}

impl WaitSlot {
    const fn new() -> Self {
        Self {
            grant: AtomicU64::new(0),
        }
    }
}

pub(crate) struct WaitRing {
    slots: Box<[WaitSlot]>,
    front: AtomicU64,
    back: AtomicU64,
}

impl WaitRing {
    /// Allocate a ring able to hold `capacity` queued waiters (minimum 1)
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| WaitSlot::new()).collect(),
            front: AtomicU64::new(0),
            back: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        // front first: back can only have grown past it since
        let front = self.front.load(Ordering::Relaxed);
        self.back.load(Ordering::Relaxed).saturating_sub(front) as usize
    }

    #[inline]
    fn slot(&self, ticket: u64) -> &WaitSlot {
        &self.slots[(ticket % self.slots.len() as u64) as usize]
    }

    /// Reserve the next ticket at the back of the queue
    pub(crate) fn enqueue(&self) -> SyncResult<u64> {
        if self.len() >= self.capacity() {
            return Err(SyncError::QueueOverflow {
                capacity: self.capacity(),
            });
        }
        let ticket = self.back.load(Ordering::Relaxed);
        self.back.store(ticket + 1, Ordering::Relaxed);
        Ok(ticket)
    }

    /// Pop the ticket at the front of the queue
    pub(crate) fn dequeue(&self) -> Option<u64> {
        let front = self.front.load(Ordering::Relaxed);
        if front == self.back.load(Ordering::Relaxed) {
            return None;
        }
        self.front.store(front + 1, Ordering::Relaxed);
        Some(front)
    }

    /// Release the waiter holding `ticket`
    #[inline]
    pub(crate) fn grant(&self, ticket: u64) {
        self.slot(ticket).grant.fetch_max(ticket + 1, Ordering::Release);
    }

    /// Busy-wait until `ticket` has been granted
    #[inline]
    pub(crate) fn wait_for_grant(&self, ticket: u64, backoff: &mut Backoff) {
        let slot = self.slot(ticket);
        backoff.wait_until(|| slot.grant.load(Ordering::Acquire) > ticket);
    }
}
