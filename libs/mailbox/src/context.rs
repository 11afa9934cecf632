//! Shared mailbox context
//!
//! One long-lived handle owned jointly by every mailbox: the ready queue,
//! the teardown release hook, the default ring size and the metrics. It is
//! passed explicitly instead of living in a global, so tests can build as
//! many independent contexts as they like.

use crate::error::{MailboxError, Result};
use crate::mailbox::Mailbox;
use crate::message::ActorId;
use crate::metrics::MqMetrics;
use crate::ready_queue::ReadyQueue;
use crate::release::{DropAll, ReleaseHandler};
use mq_config::MqConfig;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub struct MqContext {
    ready: ReadyQueue<Arc<Mailbox>>,
    release: Box<dyn ReleaseHandler>,
    mailbox_capacity: usize,
    metrics: MqMetrics,
}

impl MqContext {
    /// Build a context sized by `config`
    pub fn new(config: &MqConfig, release: impl ReleaseHandler + 'static) -> Result<Arc<Self>> {
        if config.mailbox_capacity == 0 {
            return Err(MailboxError::InvalidCapacity {
                structure: "mailbox",
                requested: 0,
            });
        }

        let ready = ReadyQueue::with_capacity(config.ready_queue_capacity)?;
        info!(
            ready_queue_capacity = config.ready_queue_capacity,
            mailbox_capacity = config.mailbox_capacity,
            "mailbox context created"
        );

        Ok(Arc::new(Self {
            ready,
            release: Box::new(release),
            mailbox_capacity: config.mailbox_capacity,
            metrics: MqMetrics::default(),
        }))
    }

    /// Default sizes, multicast payloads dropped on teardown
    pub fn from_defaults() -> Result<Arc<Self>> {
        Self::new(&MqConfig::default(), DropAll)
    }

    /// Create the mailbox for a freshly registered actor
    pub fn mailbox(self: &Arc<Self>, id: ActorId) -> Arc<Mailbox> {
        Mailbox::new(id, Arc::clone(self))
    }

    /// Next mailbox with pending work, if any
    ///
    /// `None` may mean contention rather than emptiness; workers retry.
    /// This is the only way out of the ready queue, so every dequeued
    /// mailbox learns it has left and can be announced again.
    pub fn pop_ready(&self) -> Option<Arc<Mailbox>> {
        let mailbox = self.ready.pop()?;
        mailbox.mark_dequeued();
        self.metrics.record_dequeued();
        Some(mailbox)
    }

    pub(crate) fn ready_queue(&self) -> &ReadyQueue<Arc<Mailbox>> {
        &self.ready
    }

    /// Mailboxes announced and not yet taken by a worker
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn metrics(&self) -> &MqMetrics {
        &self.metrics
    }

    pub fn default_mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    pub(crate) fn release_handler(&self) -> &dyn ReleaseHandler {
        self.release.as_ref()
    }

    /// Drop every mailbox reference still queued
    ///
    /// Queued mailboxes hold the context alive and the context holds them,
    /// so this must run at process shutdown once workers have stopped.
    pub fn shutdown(&self) -> usize {
        let dropped = self.ready.drain().len();
        info!(dropped, "mailbox context shut down");
        dropped
    }
}

impl fmt::Debug for MqContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqContext")
            .field("ready", &self.ready)
            .field("mailbox_capacity", &self.mailbox_capacity)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
