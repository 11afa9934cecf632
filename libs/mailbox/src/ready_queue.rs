//! Ready Queue
//!
//! Fixed-capacity lock-free ring of mailboxes that have pending work and
//! are not already being dispatched. Producers announce a mailbox with
//! [`ReadyQueue::push`]; dispatcher workers take the next one through
//! [`MqContext::pop_ready`](crate::MqContext::pop_ready), which pops here
//! and tells the mailbox it has left the queue.
//!
//! # Protocol
//!
//! ```text
//!  push:  ticket = tail.fetch_add(1)        pop:  h = head.load()
//!         wait slot[ticket % cap] vacant          h == tail       -> None
//!         write slot                              stamp != h + 1  -> None (in flight)
//!         stamp = ticket + 1  (Release)           CAS head h -> h + 1, lost -> None
//!                                                 take slot, stamp = 0 (Release)
//! ```
//!
//! Claiming a ticket and writing the slot are two steps, so a consumer that
//! reaches a claimed slot early sees an unpublished stamp and backs off
//! instead of reading stale data. Stamps carry the ticket, so a leftover
//! flag from the previous lap is never mistaken for the current occupant.
//!
//! An empty result is indistinguishable from transient contention. Workers
//! are expected to retry.

use crate::error::{MailboxError, Result};
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Stamp of a slot with no occupant
const VACANT: u64 = 0;

struct Slot<T> {
    /// `ticket + 1` of the occupant once its write is visible, else [`VACANT`]
    stamp: AtomicU64,
    value: UnsafeCell<Option<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            stamp: AtomicU64::new(VACANT),
            value: UnsafeCell::new(None),
        }
    }
}

/// Bounded multi-producer multi-consumer ring of ready mailboxes
pub struct ReadyQueue<T> {
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    slots: Box<[Slot<T>]>,
}

// SAFETY: a slot's value is written only by the producer holding its ticket
// while the stamp is VACANT, and taken only by the consumer whose CAS on
// `head` claimed that ticket. Stamp stores/loads are Release/Acquire, so the
// two accesses never overlap and the write happens-before the take.
unsafe impl<T: Send> Send for ReadyQueue<T> {}
unsafe impl<T: Send> Sync for ReadyQueue<T> {}

impl<T> ReadyQueue<T> {
    /// Create a queue with `capacity` slots. Capacity never changes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MailboxError::InvalidCapacity {
                structure: "ready queue",
                requested: capacity,
            });
        }

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots: (0..capacity).map(|_| Slot::new()).collect(),
        })
    }

    /// Append `item` at the tail. Never fails while under capacity.
    ///
    /// Lock-free but not wait-free: if the slot's previous occupant has been
    /// claimed by a consumer that has not yet taken it, this spins (with
    /// backoff) until that consumer clears the stamp. The wait covers only
    /// the few instructions between the consumer's CAS and its store; a
    /// mailbox announcement pays it while holding the mailbox lock.
    ///
    /// # Panics
    ///
    /// When the claimed ticket is a full lap ahead of the head. The queue
    /// has no growth path; running out of slots is a sizing error.
    pub fn push(&self, item: T) {
        let ticket = self.tail.fetch_add(1, Ordering::AcqRel);
        let head = self.head.load(Ordering::Acquire);
        let capacity = self.slots.len() as u64;

        if ticket.saturating_sub(head) >= capacity {
            error!(
                ticket,
                head,
                capacity,
                "ready queue overflow: more ready mailboxes than slots"
            );
            panic!(
                "ready queue overflow: ticket {} is a full lap ahead of head {} (capacity {})",
                ticket, head, capacity
            );
        }

        let slot = &self.slots[(ticket % capacity) as usize];

        // The previous occupant's ticket is already behind `head`; wait for
        // its consumer to finish taking it.
        let backoff = Backoff::new();
        while slot.stamp.load(Ordering::Acquire) != VACANT {
            backoff.snooze();
        }

        // SAFETY: this producer owns `ticket`, and the stamp is VACANT, so no
        // consumer can be reading the slot (see the impl-level comment).
        unsafe {
            *slot.value.get() = Some(item);
        }
        slot.stamp.store(ticket + 1, Ordering::Release);
    }

    /// Take the head item, if one is published and this caller wins it
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Acquire);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        let capacity = self.slots.len() as u64;
        let slot = &self.slots[(head % capacity) as usize];

        // Claimed by a producer that has not finished writing it yet
        if slot.stamp.load(Ordering::Acquire) != head + 1 {
            return None;
        }

        // CAS against the shared counter: if another consumer advanced it
        // since the load above, this caller lost the slot.
        if self
            .head
            .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // SAFETY: the successful CAS gives this consumer exclusive claim on
        // ticket `head`; the Acquire load of its stamp made the write visible.
        let item = unsafe { (*slot.value.get()).take() };
        slot.stamp.store(VACANT, Ordering::Release);
        item
    }

    /// Pop until the queue reports empty. Used at shutdown.
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }

    /// Claimed tickets not yet popped, including in-flight pushes
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.saturating_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> fmt::Debug for ReadyQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyQueue")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("capacity", &self.slots.len())
            .finish()
    }
}
