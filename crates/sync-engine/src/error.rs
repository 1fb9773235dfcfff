// crates/sync-engine/src/error.rs
//! Error types for sync operations

use crate::remote::RemoteError;
use momentum_core::AppError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during synchronization
#[derive(Debug, Error)]
pub enum SyncError {
    /// The cloud record store rejected or failed a request
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Reading or writing the local store failed
    #[error("Local store error: {0}")]
    Store(#[from] AppError),

    /// A sync pass is already running
    #[error("Sync already in progress")]
    AlreadyInProgress,

    /// No queued conflict has this identifier
    #[error("Conflict not found: {0}")]
    ConflictNotFound(String),

    /// A remote payload could not be decoded into its record type
    #[error("Invalid sync data: {0}")]
    InvalidData(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}
