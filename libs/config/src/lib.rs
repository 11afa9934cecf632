//! # Mailbox Core Configuration
//!
//! Default sizes and runtime configuration for the actor mailbox core.
//!
//! ## Features
//!
//! - **Defaults**: initial mailbox ring size, ready-queue slot count
//! - **Runtime Configuration**: TOML file + environment overrides
//!
//! ## Usage
//!
//! ```rust
//! use mq_config::{defaults, MqConfig};
//!
//! let config = MqConfig::default();
//! assert_eq!(config.mailbox_capacity, defaults::DEFAULT_QUEUE_SIZE);
//! assert_eq!(config.ready_queue_capacity, defaults::MAX_GLOBAL_MQ);
//! ```

pub mod defaults;
pub mod mq_config;

// Re-export commonly used types
pub use defaults::*;
pub use mq_config::{load_config, MqConfig};
