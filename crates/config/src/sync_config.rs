//! Synchronization configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Largest batch the cloud store accepts
pub const MAX_BATCH_SIZE: usize = 400;

/// Which collections a sync covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScopeSetting {
    Planner,
    Finance,
    All,
}

impl std::fmt::Display for ScopeSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeSetting::Planner => write!(f, "planner"),
            ScopeSetting::Finance => write!(f, "finance"),
            ScopeSetting::All => write!(f, "all"),
        }
    }
}

impl FromStr for ScopeSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "planner" => Ok(ScopeSetting::Planner),
            "finance" => Ok(ScopeSetting::Finance),
            "all" => Ok(ScopeSetting::All),
            other => Err(format!("unknown sync scope '{}'", other)),
        }
    }
}

/// Automatic retry tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        }
    }
}

/// Synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Records per upload or delete request
    pub batch_size: usize,

    /// Sync periodically while a long-running command is active
    pub auto_sync: bool,

    /// Seconds between automatic syncs
    pub interval_secs: u64,

    /// Collections covered by a sync without an explicit scope
    pub scope: ScopeSetting,

    pub retry: RetryConfig,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            auto_sync: false,
            interval_secs: 300,
            scope: ScopeSetting::All,
            retry: RetryConfig::default(),
        }
    }
}

impl ConfigSection for SyncConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let max_delay = if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            Err(ValidationError::with_value(
                "sync.retry.max_delay_ms",
                "must not be below initial_delay_ms",
                self.retry.max_delay_ms,
            ))
        } else {
            Ok(())
        };

        Validator::collect_errors(vec![
            Validator::in_range(self.batch_size, 1, MAX_BATCH_SIZE, "sync.batch_size"),
            Validator::in_range(self.interval_secs, 10, 86_400, "sync.interval_secs"),
            Validator::in_range(self.retry.max_attempts, 1, 10, "sync.retry.max_attempts"),
            Validator::at_least(self.retry.initial_delay_ms, 1, "sync.retry.initial_delay_ms"),
            max_delay,
            Validator::in_range(self.retry.multiplier, 1.0, 10.0, "sync.retry.multiplier"),
        ])
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "sync"
    }
}
