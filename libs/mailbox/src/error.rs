//! Mailbox core errors
//!
//! Construction errors and the protocol violations a dispatcher can commit
//! against a mailbox's state machine. The panicking operations treat the
//! violations as fatal; the `try_*` variants hand them back instead.

use crate::mailbox::Membership;
use crate::message::{ActorId, Session};
use thiserror::Error;

/// Errors raised by the ready queue and mailbox operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailboxError {
    /// A ring or queue was asked for zero slots
    #[error("Invalid capacity {requested} for {structure}: must be at least 1")]
    InvalidCapacity {
        structure: &'static str,
        requested: usize,
    },

    /// `lock` while another session already holds the mailbox
    #[error("Mailbox {actor} already locked by session {held} (requested session {requested})")]
    AlreadyLocked {
        actor: ActorId,
        held: Session,
        requested: Session,
    },

    /// `lock` outside the window right after the mailbox left the ready queue
    #[error("Mailbox {actor} cannot be locked in state {state:?}: expected Queued")]
    NotQueued { actor: ActorId, state: Membership },

    /// Session 0 means "unlocked" and cannot be used as a lock token
    #[error("Session 0 is reserved for the unlocked state (mailbox {actor})")]
    ReservedSession { actor: ActorId },

    /// `mark_release` called a second time
    #[error("Release already requested for mailbox {actor}")]
    ReleaseAlreadyMarked { actor: ActorId },

    /// The mailbox has been torn down
    #[error("Mailbox {actor} is closed")]
    Closed { actor: ActorId },
}

impl MailboxError {
    /// Whether this error is a dispatcher protocol violation
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            MailboxError::AlreadyLocked { .. }
                | MailboxError::NotQueued { .. }
                | MailboxError::ReservedSession { .. }
                | MailboxError::ReleaseAlreadyMarked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MailboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = MailboxError::AlreadyLocked {
            actor: ActorId::new(0x2a),
            held: 7,
            requested: 9,
        };
        let text = err.to_string();
        assert!(text.contains(":0000002a"));
        assert!(text.contains("session 7"));
        assert!(err.is_protocol_violation());

        let err = MailboxError::InvalidCapacity {
            structure: "ready queue",
            requested: 0,
        };
        assert!(!err.is_protocol_violation());
        assert!(err.to_string().contains("ready queue"));
    }
}
