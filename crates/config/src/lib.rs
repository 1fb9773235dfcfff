//! Momentum configuration
//!
//! Settings live in `config.toml` inside the platform config directory. Each
//! table of the file is a type implementing [`ConfigSection`], so sections
//! validate and merge independently.
//!
//! # Example
//!
//! ```rust,no_run
//! use momentum_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Batch size: {}", config.sync.batch_size);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

pub mod app_config;
pub mod sync_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{apply_env_overrides, ConfigManager, ENV_PREFIX};
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel, StorageBackend};
pub use sync_config::{RetryConfig, ScopeSetting, SyncConfig, MAX_BATCH_SIZE};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Storage and logging settings
    pub app: AppConfig,

    /// Synchronization settings
    pub sync: SyncConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.sync.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.sync.merge(other.sync);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_errors_from_every_section() {
        let mut config = Config::default();
        config.app.data_dir = Some(std::path::PathBuf::new());
        config.sync.batch_size = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "app.data_dir");
        assert_eq!(errors[1].field, "sync.batch_size");
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.sync.batch_size = 50;
        other.app.storage = StorageBackend::Sqlite;

        base.merge(other);
        assert_eq!(base.sync.batch_size, 50);
        assert_eq!(base.app.storage, StorageBackend::Sqlite);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[sync]\nbatch_size = 25\n").unwrap();
        assert_eq!(config.sync.batch_size, 25);
        assert_eq!(config.sync.retry, RetryConfig::default());
        assert_eq!(config.app, AppConfig::default());
    }
}
