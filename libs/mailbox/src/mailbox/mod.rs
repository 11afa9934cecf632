//! Per-actor Mailbox
//!
//! A growable ring of messages behind a lock, plus the membership state
//! that ties the mailbox to the shared ready queue.
//!
//! # Membership
//!
//! ```text
//!            push (unlocked, idle)                 lock(session)
//! NotQueued ───────────────────────► Queued ─────────────────────► Dispatching
//!     ▲                               │  ▲                             │
//!     └──── pop (message) ────────────┘  │    pushglobal / release     │
//!                                        │    while session pending    ▼
//!                                        └──── reply (pushhead) ◄── DispatchingAndLocked
//! ```
//!
//! A mailbox is announced (pushed into the ready queue) only while its lock
//! is held and only if it is not already sitting in the queue, so it is
//! present there at most once.
//!
//! # Lock sessions
//!
//! A worker that [`lock`](Mailbox::lock)s a mailbox with a session id gets
//! priority delivery of the one reply carrying that session: it is inserted
//! ahead of everything already queued and clears the session. While a
//! session is pending, announcements are deferred to the reply.
//!
//! # Teardown
//!
//! [`mark_release`](Mailbox::mark_release) then [`release`](Mailbox::release)
//! closes the mailbox and drains it. Multicast payloads go to the context's
//! [`ReleaseHandler`](crate::ReleaseHandler); everything else is dropped.
//! Pushes that race in after the close take the same route.

mod ring;

use crate::context::MqContext;
use crate::error::{MailboxError, Result};
use crate::message::{ActorId, Message, Session};
use parking_lot::Mutex;
use ring::MessageRing;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// How a mailbox is currently represented in the ready queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Membership {
    /// Idle: the next unlocked push announces it
    NotQueued = 0,
    /// Announced and not yet drained by a worker
    Queued = 1,
    /// Locked by a worker that is servicing it
    Dispatching = 2,
    /// Locked, and the worker finished its turn; the reply re-announces it
    DispatchingAndLocked = 3,
}

struct MailboxState {
    ring: MessageRing,
    membership: Membership,
    /// 0 = unlocked
    lock_session: Session,
    /// A reference sits in the ready queue
    in_ready_queue: bool,
    closed: bool,
}

pub struct Mailbox {
    id: ActorId,
    ctx: Arc<MqContext>,
    release_requested: AtomicBool,
    state: Mutex<MailboxState>,
}

impl Mailbox {
    /// Create a mailbox with the context's default ring size
    pub fn new(id: ActorId, ctx: Arc<MqContext>) -> Arc<Self> {
        let capacity = ctx.default_mailbox_capacity();
        Self::build(id, ctx, capacity)
    }

    /// Create a mailbox with an explicit initial ring size
    pub fn with_capacity(id: ActorId, ctx: Arc<MqContext>, capacity: usize) -> Result<Arc<Self>> {
        if capacity == 0 {
            return Err(MailboxError::InvalidCapacity {
                structure: "mailbox",
                requested: capacity,
            });
        }
        Ok(Self::build(id, ctx, capacity))
    }

    fn build(id: ActorId, ctx: Arc<MqContext>, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            ctx,
            release_requested: AtomicBool::new(false),
            state: Mutex::new(MailboxState {
                ring: MessageRing::with_capacity(capacity),
                membership: Membership::NotQueued,
                lock_session: 0,
                in_ready_queue: false,
                closed: false,
            }),
        })
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Queue a message
    ///
    /// A reply matching the pending lock session jumps to the head and
    /// ends the session. Otherwise the message goes to the tail, and an
    /// idle, unlocked mailbox announces itself.
    pub fn push(self: &Arc<Self>, message: Message) {
        let mut state = self.state.lock();

        if state.closed {
            drop(state);
            warn!(actor = %self.id, source = %message.source, "push into closed mailbox");
            self.ctx.metrics().record_push_after_close();
            self.discard(message);
            return;
        }

        self.ctx.metrics().record_push();

        if state.lock_session != 0 && message.session == state.lock_session {
            self.push_head(&mut state, message);
            return;
        }

        if state.ring.push_back(message) {
            self.ctx.metrics().record_expansion();
        }

        // Locked: whoever holds the session re-announces it
        if state.lock_session == 0 && state.membership == Membership::NotQueued {
            self.announce(&mut state);
        }
    }

    /// Take the head message
    ///
    /// A successful pop moves a `Queued` mailbox back to `NotQueued`; the
    /// worker re-announces it with [`pushglobal`](Self::pushglobal) or
    /// [`release`](Self::release) once its turn ends. Lock states are left
    /// for the session to resolve.
    pub fn pop(&self) -> Option<Message> {
        let mut state = self.state.lock();
        let message = state.ring.pop_front()?;

        if state.membership == Membership::Queued {
            state.membership = Membership::NotQueued;
        }
        self.ctx.metrics().record_pop();
        Some(message)
    }

    /// Re-enter the ready queue at the end of a worker's turn
    ///
    /// Deferred while a lock session is pending: the reply announces it.
    pub fn pushglobal(self: &Arc<Self>) {
        let mut state = self.state.lock();
        self.reannounce(&mut state);
    }

    /// Claim the mailbox for `session`, right after taking it from the
    /// ready queue
    ///
    /// # Panics
    ///
    /// On any protocol violation; see [`try_lock`](Self::try_lock).
    pub fn lock(&self, session: Session) {
        if let Err(err) = self.try_lock(session) {
            error!(actor = %self.id, %err, "mailbox lock protocol violation");
            panic!("{}", err);
        }
    }

    /// [`lock`](Self::lock) that reports protocol violations instead of
    /// panicking
    pub fn try_lock(&self, session: Session) -> Result<()> {
        if session == 0 {
            return Err(MailboxError::ReservedSession { actor: self.id });
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(MailboxError::Closed { actor: self.id });
        }
        if state.lock_session != 0 {
            return Err(MailboxError::AlreadyLocked {
                actor: self.id,
                held: state.lock_session,
                requested: session,
            });
        }
        if state.membership != Membership::Queued {
            return Err(MailboxError::NotQueued {
                actor: self.id,
                state: state.membership,
            });
        }

        state.membership = Membership::Dispatching;
        state.lock_session = session;
        debug!(actor = %self.id, session, "mailbox locked");
        Ok(())
    }

    /// Request teardown at the worker's next [`release`](Self::release)
    ///
    /// # Panics
    ///
    /// If release was already requested.
    pub fn mark_release(&self) {
        if let Err(err) = self.try_mark_release() {
            error!(actor = %self.id, %err, "mailbox release requested twice");
            panic!("{}", err);
        }
    }

    pub fn try_mark_release(&self) -> Result<()> {
        if self.release_requested.swap(true, Ordering::AcqRel) {
            return Err(MailboxError::ReleaseAlreadyMarked { actor: self.id });
        }
        debug!(actor = %self.id, "mailbox release requested");
        Ok(())
    }

    /// End the worker's turn
    ///
    /// If release was requested, closes and drains the mailbox and returns
    /// the number of messages drained. Otherwise re-announces it (same
    /// rules as [`pushglobal`](Self::pushglobal)) and returns 0.
    pub fn release(self: &Arc<Self>) -> usize {
        if self.release_requested.load(Ordering::Acquire) {
            return self.teardown();
        }

        let mut state = self.state.lock();
        self.reannounce(&mut state);
        0
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    pub fn membership(&self) -> Membership {
        self.state.lock().membership
    }

    /// Pending lock session, 0 when unlocked
    pub fn lock_session(&self) -> Session {
        self.state.lock().lock_session
    }

    pub fn is_release_marked(&self) -> bool {
        self.release_requested.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Called by the context once a worker has taken this mailbox out of
    /// the ready queue.
    pub(crate) fn mark_dequeued(&self) {
        self.state.lock().in_ready_queue = false;
    }

    /// Insert a lock-session reply ahead of everything queued
    fn push_head(self: &Arc<Self>, state: &mut MailboxState, message: Message) {
        if state.ring.push_front(message) {
            self.ctx.metrics().record_expansion();
        }
        self.ctx.metrics().record_priority_insert();

        match state.membership {
            // The worker already ended its turn; the reply brings it back
            Membership::DispatchingAndLocked => self.announce(state),
            Membership::Dispatching => {}
            other => {
                error!(actor = %self.id, state = ?other, "session reply in unexpected state");
                panic!(
                    "mailbox {}: session reply arrived in state {:?}, expected Dispatching or DispatchingAndLocked",
                    self.id, other
                );
            }
        }

        debug!(actor = %self.id, session = state.lock_session, "mailbox unlocked by reply");
        state.lock_session = 0;
    }

    fn reannounce(self: &Arc<Self>, state: &mut MailboxState) {
        if state.closed || state.in_ready_queue {
            return;
        }

        if state.lock_session != 0 {
            state.membership = Membership::DispatchingAndLocked;
            self.ctx.metrics().record_deferred_announcement();
            trace!(actor = %self.id, session = state.lock_session, "announcement deferred to reply");
            return;
        }

        self.announce(state);
    }

    /// Mark `Queued` and push into the ready queue unless already there
    fn announce(self: &Arc<Self>, state: &mut MailboxState) {
        state.membership = Membership::Queued;
        if state.in_ready_queue {
            return;
        }

        state.in_ready_queue = true;
        self.ctx.ready_queue().push(Arc::clone(self));
        self.ctx.metrics().record_announcement();
        trace!(actor = %self.id, "mailbox announced");
    }

    /// Close the mailbox and route every remaining message to its release
    fn teardown(&self) -> usize {
        {
            let mut state = self.state.lock();
            if state.closed {
                warn!(actor = %self.id, "release on a mailbox already torn down");
                return 0;
            }
            state.closed = true;
            state.lock_session = 0;
            state.membership = Membership::NotQueued;
        }

        // Closed first: racing pushes now bypass the ring
        let mut drained = 0;
        while let Some(message) = self.take_front() {
            drained += 1;
            self.discard(message);
        }

        self.state.lock().ring = MessageRing::with_capacity(1);
        self.ctx.metrics().record_teardown(drained);
        info!(actor = %self.id, drained, "mailbox torn down");
        drained
    }

    fn take_front(&self) -> Option<Message> {
        self.state.lock().ring.pop_front()
    }

    fn discard(&self, message: Message) {
        release_payload(&self.ctx, message);
    }
}

/// Hand a multicast payload back, free anything else
fn release_payload(ctx: &MqContext, message: Message) {
    if message.is_multicast() {
        ctx.metrics().record_multicast_release();
        ctx.release_handler().release_multicast(message);
    } else {
        drop(message);
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        let ctx = &self.ctx;
        let state = self.state.get_mut();
        let mut dropped = 0usize;
        while let Some(message) = state.ring.pop_front() {
            dropped += 1;
            release_payload(ctx, message);
        }
        if dropped > 0 {
            debug!(actor = %self.id, dropped, "mailbox dropped with queued messages");
        }
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Mailbox");
        out.field("id", &self.id);
        if let Some(state) = self.state.try_lock() {
            out.field("len", &state.ring.len())
                .field("capacity", &state.ring.capacity())
                .field("membership", &state.membership)
                .field("lock_session", &state.lock_session)
                .field("closed", &state.closed);
        }
        out.field("release_requested", &self.is_release_marked())
            .finish_non_exhaustive()
    }
}
