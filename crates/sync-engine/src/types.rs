// crates/sync-engine/src/types.rs
//! Sync status, published snapshot and options

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::classify::{ClassifiedError, SyncErrorKind};
use crate::conflict::Conflict;
use momentum_core::{EntityKind, Timestamp};
use momentum_resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Where the orchestrator stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error(SyncErrorKind),
    ConflictResolutionNeeded,
    TemporarilyUnavailable,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Success => write!(f, "success"),
            Self::Error(kind) => write!(f, "error({})", kind),
            Self::ConflictResolutionNeeded => write!(f, "conflict resolution needed"),
            Self::TemporarilyUnavailable => write!(f, "temporarily unavailable"),
        }
    }
}

/// Everything a UI binds to, published after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSnapshot {
    pub status: SyncStatus,
    pub last_sync: Option<Timestamp>,
    /// Fraction of phases finished in the current pass
    pub progress: f64,
    pub last_error: Option<ClassifiedError>,
    pub conflicts: Vec<Conflict>,
    /// Set when a failure should be shown to the user
    pub show_alert: bool,
}

/// Which collections a pass covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncScope {
    #[default]
    Planner,
    Finance,
    All,
}

impl SyncScope {
    /// Kinds in phase order
    pub fn kinds(&self) -> Vec<EntityKind> {
        match self {
            Self::Planner => EntityKind::PLANNER.to_vec(),
            Self::Finance => EntityKind::FINANCE.to_vec(),
            Self::All => EntityKind::all(),
        }
    }
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planner => write!(f, "planner"),
            Self::Finance => write!(f, "finance"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for SyncScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planner" => Ok(Self::Planner),
            "finance" => Ok(Self::Finance),
            "all" => Ok(Self::All),
            other => Err(format!("unknown sync scope '{}'", other)),
        }
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub scope: SyncScope,
    pub batch_size: usize,
    /// Backoff for automatic retries after server and busy errors
    pub retry_policy: RetryPolicy,
    /// Resends of a single throttled chunk
    pub chunk_retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            scope: SyncScope::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry_policy: RetryPolicy::default(),
            chunk_retry: RetryPolicy::none(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncOptions {
    pub fn with_scope(mut self, scope: SyncScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_chunk_retry(mut self, policy: RetryPolicy) -> Self {
        self.chunk_retry = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
