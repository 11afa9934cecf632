//! Actor Mailbox Core
//!
//! Message-delivery core of the actor runtime: one [`Mailbox`] per actor and
//! a shared [`ReadyQueue`] telling dispatcher workers which mailboxes have
//! undelivered messages.
//!
//! # Architecture
//!
//! ```text
//!  producers          per-actor mailboxes              workers
//! ┌─────────┐  push  ┌──────────────────────┐        ┌──────────┐
//! │ actor A │───────►│ Mailbox: ring + lock │        │ worker 0 │
//! └─────────┘        └──────────┬───────────┘        └────▲─────┘
//!                               │ idle → has work         │ pop_ready
//!                               ▼                         │
//!                    ┌──────────────────────┐             │
//!                    │ ReadyQueue (lock-free│─────────────┘
//!                    │ ring of mailboxes)   │
//!                    └──────────────────────┘
//! ```
//!
//! - A mailbox enters the ready queue when it goes from idle to having work,
//!   and is present there at most once.
//! - Messages in one mailbox are FIFO, except the reply to a pending lock
//!   session, which jumps ahead of everything queued.
//! - Teardown drains a mailbox exactly once, routing multicast payloads to a
//!   [`ReleaseHandler`].
//!
//! # Examples
//!
//! ```rust
//! use actor_mailbox::{ActorId, Message, MqContext};
//!
//! let ctx = MqContext::from_defaults().unwrap();
//! let mailbox = ctx.mailbox(ActorId::new(1));
//!
//! mailbox.push(Message::new(ActorId::new(2), 0, "ping"));
//!
//! // Worker side
//! let ready = ctx.pop_ready().unwrap();
//! while let Some(message) = ready.pop() {
//!     assert_eq!(message.payload.as_bytes(), b"ping");
//! }
//! ready.release();
//! ctx.shutdown();
//! ```

pub mod context;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod metrics;
pub mod ready_queue;
pub mod release;

pub use context::MqContext;
pub use error::{MailboxError, Result};
pub use mailbox::{Mailbox, Membership};
pub use message::{ActorId, Message, Payload, PayloadTag, Session};
pub use metrics::{MetricsSnapshot, MqMetrics};
pub use ready_queue::ReadyQueue;
pub use release::{DropAll, ReleaseHandler};
