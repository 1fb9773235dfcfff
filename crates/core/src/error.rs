//! Error types and recovery strategies for local data
//!
//! Errors fall into three severity tiers:
//! - **Recoverable**: Worth retrying (busy database, transient I/O failure)
//! - **Degraded**: The request was refused but nothing is damaged (bad input, missing record)
//! - **Fatal**: The local database itself cannot be used
//!
//! Each error carries a recovery action the CLI shows next to its user message.
//! Sync failures are classified separately by the sync engine.

use std::fmt;
use std::io;
use thiserror::Error;

/// What the user can do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Run the same command again
    RetryWithBackoff,
    /// Remove the local database and sync to rebuild it from the cloud
    RebuildFromCloud,
    /// Change the input or the environment before trying again
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryWithBackoff => write!(f, "Try again in a moment"),
            Self::RebuildFromCloud => {
                write!(f, "Remove the local database and sync to rebuild it")
            }
            Self::UserIntervention => write!(f, "Check the input and try again"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Request refused but local data is intact
    Degraded,
    /// Local storage is unusable
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Errors raised by the local store and its database
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `PRAGMA integrity_check` reported damage
    #[error("Database corrupted: {details}")]
    DatabaseCorrupted { details: String },

    /// Database migration failed
    #[error("Migration failed: {version} - {reason}")]
    MigrationFailed { version: String, reason: String },

    /// Record not found in a collection
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    /// Record identifier already present in a collection
    #[error("Duplicate record: {entity} with {identifier}")]
    DuplicateRecord { entity: String, identifier: String },

    /// Encoding or decoding a record failed
    #[error("Serialization error: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File I/O failed
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    /// A record failed its own validation
    #[error("Invalid {entity}: {}", .errors.join("; "))]
    ValidationFailed { entity: String, errors: Vec<String> },

    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DatabaseError { .. } | Self::IoError { .. } if !self.is_permission_denied() => {
                ErrorSeverity::Recoverable
            }

            Self::DatabaseCorrupted { .. }
            | Self::MigrationFailed { .. }
            | Self::InternalError { .. } => ErrorSeverity::Fatal,

            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self.severity() {
            ErrorSeverity::Recoverable => RecoveryAction::RetryWithBackoff,
            ErrorSeverity::Fatal if !matches!(self, Self::InternalError { .. }) => {
                RecoveryAction::RebuildFromCloud
            }
            _ => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::DatabaseError { .. } => {
                "Storage is temporarily unavailable. Please try again.".to_string()
            }
            Self::DatabaseCorrupted { .. } => "The local database is damaged.".to_string(),
            Self::MigrationFailed { .. } => {
                "The local database could not be upgraded.".to_string()
            }
            Self::RecordNotFound { entity, .. } => {
                format!("The requested {} was not found.", entity.to_lowercase())
            }
            Self::DuplicateRecord { .. } => "This item already exists.".to_string(),
            Self::SerializationError { .. } => {
                "Data could not be saved in the expected format.".to_string()
            }
            Self::IoError { .. } if self.is_permission_denied() => {
                "Permission denied. Check access to the data directory.".to_string()
            }
            Self::IoError { .. } => "A file operation failed. Please try again.".to_string(),
            Self::ValidationFailed { errors, .. } if !errors.is_empty() => errors.join("; "),
            Self::ValidationFailed { .. } => "The entered data is not valid.".to_string(),
            Self::InternalError { .. } => {
                "An unexpected error occurred. Please try again.".to_string()
            }
            Self::InvalidArgument { argument, reason } => format!("Invalid {}: {}", argument, reason),
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if running the operation again may succeed
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryWithBackoff
    }

    fn is_permission_denied(&self) -> bool {
        matches!(self, Self::IoError { source, .. } if source.kind() == io::ErrorKind::PermissionDenied)
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a serialization error from any error type
    pub fn serialization<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a not-found error for an entity
    pub fn not_found(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::RecordNotFound {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON encoding failed", err)
    }
}
