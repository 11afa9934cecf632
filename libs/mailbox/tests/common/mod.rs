//! Shared helpers for mailbox integration tests

#![allow(dead_code)]

use actor_mailbox::{ActorId, Message, MqContext, Session};
use mq_config::MqConfig;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&MqConfig::default()))
        .with_test_writer()
        .try_init();
});

/// `RUST_LOG` when set, otherwise the configured `log_level`
pub fn log_filter(config: &MqConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Install the test subscriber once per test binary
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub fn config(ready_queue_capacity: usize, mailbox_capacity: usize) -> MqConfig {
    MqConfig {
        ready_queue_capacity,
        mailbox_capacity,
        ..MqConfig::default()
    }
}

/// Context whose multicast releases are collected for inspection
pub fn recording_context(
    ready_queue_capacity: usize,
    mailbox_capacity: usize,
) -> (Arc<MqContext>, Arc<Mutex<Vec<Message>>>) {
    init_tracing();
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&released);
    let ctx = MqContext::new(
        &config(ready_queue_capacity, mailbox_capacity),
        move |message: Message| sink.lock().push(message),
    )
    .expect("valid config");
    (ctx, released)
}

pub fn context(ready_queue_capacity: usize, mailbox_capacity: usize) -> Arc<MqContext> {
    recording_context(ready_queue_capacity, mailbox_capacity).0
}

/// Message whose payload is the little-endian `seq`
pub fn numbered(source: u32, session: Session, seq: u64) -> Message {
    Message::new(ActorId::new(source), session, seq.to_le_bytes().to_vec())
}

pub fn seq_of(message: &Message) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&message.payload.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
