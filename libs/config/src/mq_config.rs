//! Mailbox Core Configuration Module
//!
//! Provides configuration loading for the mailbox core.
//! Supports loading from TOML files with environment-specific overrides.

use crate::defaults::{DEFAULT_LOG_LEVEL, DEFAULT_QUEUE_SIZE, ENV_PREFIX, MAX_GLOBAL_MQ};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default location of the base configuration file
const DEFAULT_CONFIG_PATH: &str = "config/mq.toml";

/// Sizing and logging settings for the mailbox core
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MqConfig {
    /// Slot count of the ready queue. Fixed for the lifetime of the context.
    pub ready_queue_capacity: usize,

    /// Initial ring size of each mailbox. Rings double on overflow.
    pub mailbox_capacity: usize,

    /// Tracing filter directive used by binaries embedding the core
    pub log_level: String,
}

impl Default for MqConfig {
    fn default() -> Self {
        Self {
            ready_queue_capacity: MAX_GLOBAL_MQ,
            mailbox_capacity: DEFAULT_QUEUE_SIZE,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl MqConfig {
    /// Load configuration from files with environment overrides
    ///
    /// Layers, lowest precedence first: built-in defaults, the base file,
    /// `environments/<environment>.toml` next to the base file, then `MQ_*`
    /// environment variables. An explicit `base_path` must exist; the
    /// default path is optional.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let (base, required) = match base_path {
            Some(path) => (expand_path(path)?, true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        debug!("Loading mailbox config from {:?} (required: {})", base, required);

        let mut builder = Config::builder()
            .add_source(File::from(base.as_path()).required(required));

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = base
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (MQ_ prefix)
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a TOML string, without file or env layers
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ready_queue_capacity == 0 {
            bail!("ready_queue_capacity must be greater than zero");
        }
        if self.mailbox_capacity == 0 {
            bail!("mailbox_capacity must be greater than zero");
        }
        if self.log_level.trim().is_empty() {
            bail!("log_level must not be empty");
        }
        if !self.ready_queue_capacity.is_power_of_two() {
            debug!(
                "ready_queue_capacity {} is not a power of two; slot index uses modulo",
                self.ready_queue_capacity
            );
        }
        Ok(())
    }
}

/// Expand `$VAR` / `~` references in a config path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).context("Failed to expand config path")?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Convenience function to load configuration with defaults
pub fn load_config(environment: Option<&str>) -> Result<MqConfig> {
    MqConfig::load(None, environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};
    use std::fs;
    use tempfile::tempdir;

    /// Held by every test that goes through the `MQ_*` environment layer
    static ENV_LOCK: Mutex<()> = const_mutex(());

    #[test]
    fn test_defaults_match_constants() {
        let config = MqConfig::default();
        assert_eq!(config.ready_queue_capacity, 0x10000);
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_base_config() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mq.toml");

        let config_content = r#"
ready_queue_capacity = 1024
mailbox_capacity = 8
log_level = "debug"
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = MqConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.ready_queue_capacity, 1024);
        assert_eq!(config.mailbox_capacity, 8);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mq.toml");
        fs::write(&config_path, "mailbox_capacity = 16\n").unwrap();

        let config = MqConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.mailbox_capacity, 16);
        assert_eq!(config.ready_queue_capacity, MAX_GLOBAL_MQ);
    }

    #[test]
    fn test_environment_override() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mq.toml");
        fs::write(&config_path, "mailbox_capacity = 16\nready_queue_capacity = 256\n").unwrap();

        let env_dir = dir.path().join("environments");
        fs::create_dir(&env_dir).unwrap();
        fs::write(env_dir.join("bench.toml"), "ready_queue_capacity = 4096\n").unwrap();

        let config = MqConfig::load(Some(&config_path), Some("bench")).unwrap();

        assert_eq!(config.mailbox_capacity, 16);
        assert_eq!(config.ready_queue_capacity, 4096);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(MqConfig::load(Some(&missing), None).is_err());
    }

    #[test]
    fn test_env_vars_override_files() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mq.toml");
        fs::write(&config_path, "mailbox_capacity = 16\nready_queue_capacity = 256\n").unwrap();

        let env_dir = dir.path().join("environments");
        fs::create_dir(&env_dir).unwrap();
        fs::write(env_dir.join("prod.toml"), "mailbox_capacity = 128\n").unwrap();

        std::env::set_var("MQ_MAILBOX_CAPACITY", "32");
        std::env::set_var("MQ_LOG_LEVEL", "warn");
        let loaded = MqConfig::load(Some(&config_path), Some("prod"));
        std::env::remove_var("MQ_MAILBOX_CAPACITY");
        std::env::remove_var("MQ_LOG_LEVEL");

        let config = loaded.unwrap();
        assert_eq!(config.mailbox_capacity, 32);
        assert_eq!(config.ready_queue_capacity, 256);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_invalid_env_override_rejected() {
        let _env = ENV_LOCK.lock();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("mq.toml");
        fs::write(&config_path, "ready_queue_capacity = 256\n").unwrap();

        std::env::set_var("MQ_READY_QUEUE_CAPACITY", "0");
        let loaded = MqConfig::load(Some(&config_path), None);
        std::env::remove_var("MQ_READY_QUEUE_CAPACITY");

        assert!(loaded.is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(MqConfig::from_toml_str("mailbox_capacity = 0\n").is_err());
        assert!(MqConfig::from_toml_str("ready_queue_capacity = 0\n").is_err());
        assert!(MqConfig::from_toml_str("log_level = \"  \"\n").is_err());
    }
}
