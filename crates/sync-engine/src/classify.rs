// crates/sync-engine/src/classify.rs
//! Maps transport and local failures onto user-facing categories

use crate::error::SyncError;
use crate::remote::RemoteErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-facing sync failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncErrorKind {
    NotSignedIn,
    NetworkIssue,
    PermissionDenied,
    QuotaExceeded,
    DeviceBusy,
    ServerError,
    AccountChanged,
    ContainerUnavailable,
    ConflictDetected,
    Unknown,
}

impl SyncErrorKind {
    /// Short banner text
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotSignedIn => "You're not signed in to your cloud account.",
            Self::NetworkIssue => "No internet connection.",
            Self::PermissionDenied => "Sync isn't allowed for this account.",
            Self::QuotaExceeded => "Your cloud storage is full.",
            Self::DeviceBusy => "The cloud service is busy.",
            Self::ServerError => "The cloud service is having problems.",
            Self::AccountChanged => "Your cloud account changed.",
            Self::ContainerUnavailable => "Cloud storage for this app is unavailable.",
            Self::ConflictDetected => "Some items were changed on another device.",
            Self::Unknown => "Sync failed.",
        }
    }

    /// Longer description shown with the banner
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::NotSignedIn => {
                "Sign in to your cloud account to keep your data in sync across devices."
            }
            Self::NetworkIssue => {
                "Your changes are saved on this device and will sync when you're back online."
            }
            Self::PermissionDenied => {
                "Parental controls or device management may be restricting cloud access."
            }
            Self::QuotaExceeded => {
                "Free up cloud storage or upgrade your plan. Only planner data will sync until then."
            }
            Self::DeviceBusy => "Too many requests were made at once. Sync will try again shortly.",
            Self::ServerError => "This is usually temporary. Sync will try again automatically.",
            Self::AccountChanged => {
                "Sync history was reset for the new account. Your local data is unchanged."
            }
            Self::ContainerUnavailable => {
                "The app's cloud container could not be reached. Reinstalling may help."
            }
            Self::ConflictDetected => {
                "Choose which version to keep for each item changed in two places."
            }
            Self::Unknown => "An unexpected error occurred while syncing.",
        }
    }

    /// Label for the one-tap recovery action
    pub fn recovery_action(&self) -> &'static str {
        match self {
            Self::NotSignedIn | Self::PermissionDenied => "Open Settings",
            Self::QuotaExceeded => "Manage Storage",
            Self::ConflictDetected => "Resolve Conflicts",
            Self::ContainerUnavailable => "Contact Support",
            Self::AccountChanged => "Sync Now",
            Self::NetworkIssue | Self::DeviceBusy | Self::ServerError | Self::Unknown => {
                "Try Again"
            }
        }
    }

    /// What the orchestrator does on its own after this failure
    pub fn follow_up(&self) -> FollowUp {
        match self {
            Self::NetworkIssue => FollowUp::RetryOnce,
            Self::ServerError | Self::DeviceBusy => FollowUp::RetryWithBackoff,
            Self::AccountChanged => FollowUp::ResetLedger,
            Self::QuotaExceeded => FollowUp::ReduceScope,
            _ => FollowUp::None,
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotSignedIn => "not-signed-in",
            Self::NetworkIssue => "network-issue",
            Self::PermissionDenied => "permission-denied",
            Self::QuotaExceeded => "quota-exceeded",
            Self::DeviceBusy => "device-busy",
            Self::ServerError => "server-error",
            Self::AccountChanged => "account-changed",
            Self::ContainerUnavailable => "container-unavailable",
            Self::ConflictDetected => "conflict-detected",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Automatic reaction to a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Schedule a single delayed retry
    RetryOnce,
    /// Retry with exponential backoff up to the policy's limit
    RetryWithBackoff,
    /// Forget the last agreed versions
    ResetLedger,
    /// Sync only the planner collections on the next pass
    ReduceScope,
    None,
}

/// A failure with its category and the underlying detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: SyncErrorKind,
    pub detail: String,
}

impl ClassifiedError {
    pub fn new(kind: SyncErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.detail)
    }
}

/// Category for a transport code
pub fn classify_code(code: RemoteErrorCode) -> SyncErrorKind {
    match code {
        RemoteErrorCode::NotAuthenticated => SyncErrorKind::NotSignedIn,
        RemoteErrorCode::NetworkUnavailable | RemoteErrorCode::NetworkFailure => {
            SyncErrorKind::NetworkIssue
        }
        RemoteErrorCode::PermissionFailure => SyncErrorKind::PermissionDenied,
        RemoteErrorCode::QuotaExceeded => SyncErrorKind::QuotaExceeded,
        RemoteErrorCode::ZoneBusy | RemoteErrorCode::RequestRateLimited => {
            SyncErrorKind::DeviceBusy
        }
        RemoteErrorCode::ServiceUnavailable
        | RemoteErrorCode::ServerRejectedRequest
        | RemoteErrorCode::InternalError => SyncErrorKind::ServerError,
        RemoteErrorCode::UserDeletedZone | RemoteErrorCode::ChangeTokenExpired => {
            SyncErrorKind::AccountChanged
        }
        RemoteErrorCode::BadContainer => SyncErrorKind::ContainerUnavailable,
        RemoteErrorCode::ServerRecordChanged => SyncErrorKind::ConflictDetected,
        RemoteErrorCode::Unknown => SyncErrorKind::Unknown,
    }
}

/// Classifies any sync failure
pub fn classify(error: &SyncError) -> ClassifiedError {
    let kind = match error {
        SyncError::Remote(remote) => classify_code(remote.code),
        SyncError::AlreadyInProgress => SyncErrorKind::DeviceBusy,
        SyncError::Store(_)
        | SyncError::ConflictNotFound(_)
        | SyncError::InvalidData(_)
        | SyncError::Serialization(_)
        | SyncError::Custom(_) => SyncErrorKind::Unknown,
    };
    ClassifiedError::new(kind, error.to_string())
}
