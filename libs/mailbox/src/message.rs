//! Mailbox Messages
//!
//! The core moves messages around without looking inside them. Only the
//! session (for lock-session priority replies) and the payload tag (for
//! teardown routing) are ever read.

use std::fmt;

/// Session token carried by a message; 0 means "no session"
pub type Session = i32;

/// Handle of the actor owning a mailbox
///
/// Allocated by the actor registry; opaque to the mailbox core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u32);

impl ActorId {
    pub const fn new(handle: u32) -> Self {
        Self(handle)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{:08x}", self.0)
    }
}

impl From<u32> for ActorId {
    fn from(handle: u32) -> Self {
        Self(handle)
    }
}

/// Bits of a packed size word below the payload tag
pub const TAG_SHIFT: u32 = 24;

/// Mask of the length part of a packed size word
pub const SIZE_MASK: usize = (1 << TAG_SHIFT) - 1;

/// Payload type discriminator assigned by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PayloadTag(u8);

impl PayloadTag {
    /// Ordinary point-to-point payload
    pub const DEFAULT: PayloadTag = PayloadTag(0);
    /// Multicast payload; must go back to the multicast subsystem on teardown
    pub const MULTICAST: PayloadTag = PayloadTag(2);

    pub const fn new(tag: u8) -> Self {
        Self(tag)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_multicast(self) -> bool {
        self.0 == Self::MULTICAST.0
    }

    /// Split a packed size word (`tag << 24 | len`) into tag and length
    pub const fn from_packed_size(packed: usize) -> (PayloadTag, usize) {
        (PayloadTag((packed >> TAG_SHIFT) as u8), packed & SIZE_MASK)
    }
}

/// Uniquely owned message body
///
/// Moved producer → mailbox → dispatcher (or → release handler on
/// teardown). Never cloned by the core.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Payload(Box<[u8]>);

impl Payload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Box<[u8]> {
        self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().into())
    }
}

/// A message queued in a mailbox
#[derive(Debug, PartialEq, Eq)]
pub struct Message {
    pub source: ActorId,
    pub session: Session,
    pub payload: Payload,
    pub tag: PayloadTag,
}

impl Message {
    pub fn new(source: ActorId, session: Session, payload: impl Into<Payload>) -> Self {
        Self {
            source,
            session,
            payload: payload.into(),
            tag: PayloadTag::DEFAULT,
        }
    }

    pub fn with_tag(mut self, tag: PayloadTag) -> Self {
        self.tag = tag;
        self
    }

    /// Multicast message; the payload is a reference owned by the multicast
    /// subsystem, so no length is encoded in the packed size.
    pub fn multicast(source: ActorId, payload: impl Into<Payload>) -> Self {
        Self::new(source, 0, payload).with_tag(PayloadTag::MULTICAST)
    }

    pub fn is_multicast(&self) -> bool {
        self.tag.is_multicast()
    }

    /// Tag and payload length packed into one word, as framed on the wire
    pub fn packed_size(&self) -> usize {
        let len = if self.is_multicast() {
            0
        } else {
            self.payload.len() & SIZE_MASK
        };
        ((self.tag.raw() as usize) << TAG_SHIFT) | len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_display() {
        assert_eq!(ActorId::new(0x10).to_string(), ":00000010");
        assert_eq!(ActorId::from(7).raw(), 7);
    }

    #[test]
    fn test_packed_size_split() {
        let msg = Message::new(ActorId::new(1), 3, "hello");
        let (tag, len) = PayloadTag::from_packed_size(msg.packed_size());
        assert_eq!(tag, PayloadTag::DEFAULT);
        assert_eq!(len, 5);

        let mc = Message::multicast(ActorId::new(1), vec![1u8, 2, 3]);
        let (tag, len) = PayloadTag::from_packed_size(mc.packed_size());
        assert!(tag.is_multicast());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_payload_moves_without_copy() {
        let payload = Payload::from(vec![9u8; 4]);
        let ptr = payload.as_bytes().as_ptr();
        let msg = Message::new(ActorId::new(2), 0, payload);
        assert_eq!(msg.payload.as_bytes().as_ptr(), ptr);
        assert_eq!(msg.payload.into_inner().len(), 4);
    }
}
