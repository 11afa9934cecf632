//! Teardown release hook
//!
//! Multicast payloads are shared with the multicast subsystem, so a mailbox
//! being torn down cannot simply free them. Each one is handed back through
//! a [`ReleaseHandler`] exactly once.

use crate::message::Message;
use tracing::trace;

/// Receives multicast messages drained from a torn-down mailbox
pub trait ReleaseHandler: Send + Sync {
    fn release_multicast(&self, message: Message);
}

/// Handler that simply drops multicast payloads
#[derive(Debug, Default, Clone, Copy)]
pub struct DropAll;

impl ReleaseHandler for DropAll {
    fn release_multicast(&self, message: Message) {
        trace!(source = %message.source, len = message.payload.len(), "dropping multicast payload");
    }
}

impl<F> ReleaseHandler for F
where
    F: Fn(Message) + Send + Sync,
{
    fn release_multicast(&self, message: Message) {
        self(message)
    }
}
