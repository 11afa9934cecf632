//! Growable circular buffer backing a mailbox
//!
//! `head == tail` means empty, so the ring is expanded the moment a write
//! would leave it completely full. Capacity doubles and never shrinks.

use crate::message::Message;
use tracing::debug;

pub(crate) struct MessageRing {
    slots: Box<[Option<Message>]>,
    head: usize,
    tail: usize,
}

impl MessageRing {
    /// `capacity` must be at least 1; checked by the mailbox constructor.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            slots: empty_slots(capacity),
            head: 0,
            tail: 0,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        let cap = self.capacity();
        (self.tail + cap - self.head) % cap
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Append at the tail. Returns `true` if the ring had to grow.
    pub(crate) fn push_back(&mut self, message: Message) -> bool {
        self.slots[self.tail] = Some(message);
        self.tail = (self.tail + 1) % self.capacity();

        if self.head == self.tail {
            let full = self.capacity();
            self.expand(full);
            return true;
        }
        false
    }

    /// Insert one slot before the head. Returns `true` if the ring had to grow.
    pub(crate) fn push_front(&mut self, message: Message) -> bool {
        let mut expanded = false;
        let mut head = self.before(self.head);

        // Only the slot at `tail` is free; filling it would read as empty.
        if head == self.tail {
            let len = self.len();
            self.expand(len);
            head = self.capacity() - 1;
            expanded = true;
        }

        self.slots[head] = Some(message);
        self.head = head;
        expanded
    }

    pub(crate) fn pop_front(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }

        let message = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        message
    }

    /// Double the capacity, moving the `len` live messages to `0..len`.
    ///
    /// The new buffer is fully built before it replaces the old one.
    fn expand(&mut self, len: usize) {
        let old_cap = self.capacity();
        let new_cap = old_cap * 2;
        let mut slots = empty_slots(new_cap);

        for (i, slot) in slots.iter_mut().take(len).enumerate() {
            *slot = self.slots[(self.head + i) % old_cap].take();
        }

        self.slots = slots;
        self.head = 0;
        self.tail = len;
        debug!(old_cap, new_cap, len, "mailbox ring expanded");
    }

    fn before(&self, index: usize) -> usize {
        if index == 0 {
            self.capacity() - 1
        } else {
            index - 1
        }
    }
}

fn empty_slots(capacity: usize) -> Box<[Option<Message>]> {
    (0..capacity).map(|_| None).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ActorId, Payload};

    fn msg(n: i32) -> Message {
        Message::new(ActorId::new(1), n, Payload::empty())
    }

    fn drain(ring: &mut MessageRing) -> Vec<i32> {
        std::iter::from_fn(|| ring.pop_front()).map(|m| m.session).collect()
    }

    #[test]
    fn test_push_back_expands_when_full() {
        let mut ring = MessageRing::with_capacity(4);
        assert!(!ring.push_back(msg(0)));
        assert!(!ring.push_back(msg(1)));
        assert!(!ring.push_back(msg(2)));
        assert!(ring.push_back(msg(3)));
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.len(), 4);
        assert_eq!(drain(&mut ring), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_expansion_from_wrapped_head_keeps_order() {
        let mut ring = MessageRing::with_capacity(4);
        for i in 0..3 {
            ring.push_back(msg(i));
        }
        assert_eq!(ring.pop_front().map(|m| m.session), Some(0));
        assert_eq!(ring.pop_front().map(|m| m.session), Some(1));
        // head = 2, wrap the tail around and fill
        for i in 3..6 {
            ring.push_back(msg(i));
        }
        assert_eq!(ring.capacity(), 8);
        assert_eq!(drain(&mut ring), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_push_front_wraps_below_zero() {
        let mut ring = MessageRing::with_capacity(4);
        ring.push_back(msg(1));
        assert!(!ring.push_front(msg(0)));
        assert_eq!(ring.head, 3);
        assert_eq!(drain(&mut ring), vec![0, 1]);
    }

    #[test]
    fn test_push_front_expands_without_losing_messages() {
        let mut ring = MessageRing::with_capacity(4);
        for i in 1..4 {
            ring.push_back(msg(i));
        }
        assert_eq!(ring.len(), 3);
        assert!(ring.push_front(msg(0)));
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.len(), 4);
        assert_eq!(drain(&mut ring), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_capacity_one_grows_on_first_push() {
        let mut ring = MessageRing::with_capacity(1);
        assert!(ring.push_back(msg(5)));
        assert_eq!(ring.capacity(), 2);
        assert!(ring.push_front(msg(4)));
        assert_eq!(drain(&mut ring), vec![4, 5]);
    }
}
