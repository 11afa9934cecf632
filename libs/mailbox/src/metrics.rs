//! Mailbox Core Metrics
//!
//! Relaxed atomic counters updated on the hot path and read as a
//! point-in-time [`MetricsSnapshot`]. Counters are monotonic.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every mailbox of one context
#[derive(Debug, Default)]
pub struct MqMetrics {
    pub messages_pushed: AtomicU64,
    pub messages_popped: AtomicU64,
    pub priority_inserts: AtomicU64,
    pub ring_expansions: AtomicU64,
    pub announcements: AtomicU64,
    pub deferred_announcements: AtomicU64,
    pub mailboxes_dequeued: AtomicU64,

    // Teardown
    pub teardowns: AtomicU64,
    pub messages_drained: AtomicU64,
    pub multicast_released: AtomicU64,
    pub pushes_after_close: AtomicU64,
}

impl MqMetrics {
    #[inline]
    pub fn record_push(&self) {
        self.messages_pushed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pop(&self) {
        self.messages_popped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_priority_insert(&self) {
        self.priority_inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_expansion(&self) {
        self.ring_expansions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_announcement(&self) {
        self.announcements.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deferred_announcement(&self) {
        self.deferred_announcements.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dequeued(&self) {
        self.mailboxes_dequeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished teardown and how many messages it drained
    pub fn record_teardown(&self, drained: usize) {
        self.teardowns.fetch_add(1, Ordering::Relaxed);
        self.messages_drained.fetch_add(drained as u64, Ordering::Relaxed);
    }

    pub fn record_multicast_release(&self) {
        self.multicast_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_after_close(&self) {
        self.pushes_after_close.fetch_add(1, Ordering::Relaxed);
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_pushed: self.messages_pushed.load(Ordering::Relaxed),
            messages_popped: self.messages_popped.load(Ordering::Relaxed),
            priority_inserts: self.priority_inserts.load(Ordering::Relaxed),
            ring_expansions: self.ring_expansions.load(Ordering::Relaxed),
            announcements: self.announcements.load(Ordering::Relaxed),
            deferred_announcements: self.deferred_announcements.load(Ordering::Relaxed),
            mailboxes_dequeued: self.mailboxes_dequeued.load(Ordering::Relaxed),
            teardowns: self.teardowns.load(Ordering::Relaxed),
            messages_drained: self.messages_drained.load(Ordering::Relaxed),
            multicast_released: self.multicast_released.load(Ordering::Relaxed),
            pushes_after_close: self.pushes_after_close.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`MqMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub messages_pushed: u64,
    pub messages_popped: u64,
    pub priority_inserts: u64,
    pub ring_expansions: u64,
    pub announcements: u64,
    pub deferred_announcements: u64,
    pub mailboxes_dequeued: u64,
    pub teardowns: u64,
    pub messages_drained: u64,
    pub multicast_released: u64,
    pub pushes_after_close: u64,
}

impl MetricsSnapshot {
    /// Messages accepted but neither popped nor drained yet
    pub fn in_flight(&self) -> u64 {
        self.messages_pushed
            .saturating_sub(self.messages_popped)
            .saturating_sub(self.messages_drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = MqMetrics::default();
        metrics.record_push();
        metrics.record_push();
        metrics.record_push();
        metrics.record_pop();
        metrics.record_teardown(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.messages_pushed, 3);
        assert_eq!(snap.messages_popped, 1);
        assert_eq!(snap.teardowns, 1);
        assert_eq!(snap.messages_drained, 1);
        assert_eq!(snap.in_flight(), 1);
    }
}
