//! Default sizes for the mailbox core
//!
//! Both structures are sized once: the ready queue never grows, a mailbox
//! ring starts at [`DEFAULT_QUEUE_SIZE`] and doubles on overflow.

/// Initial slot count of every mailbox ring
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Slot count of the process-wide ready queue
pub const MAX_GLOBAL_MQ: usize = 0x10000;

/// Default tracing filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix for environment variable overrides (`MQ_READY_QUEUE_CAPACITY`, ...)
pub const ENV_PREFIX: &str = "MQ";
