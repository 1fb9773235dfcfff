// crates/sync-engine/src/remote.rs
//! Interface to the managed cloud record store

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use momentum_core::{payload_hash, RecordId, SyncRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transport-level failure codes reported by the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorCode {
    NotAuthenticated,
    NetworkUnavailable,
    NetworkFailure,
    PermissionFailure,
    QuotaExceeded,
    ZoneBusy,
    ServiceUnavailable,
    RequestRateLimited,
    ServerRejectedRequest,
    InternalError,
    UserDeletedZone,
    ChangeTokenExpired,
    BadContainer,
    ServerRecordChanged,
    Unknown,
}

impl RemoteErrorCode {
    /// Codes for which the store asks the client to wait and resend
    pub fn is_throttle(&self) -> bool {
        matches!(
            self,
            Self::ZoneBusy | Self::RequestRateLimited | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotAuthenticated => "not authenticated",
            Self::NetworkUnavailable => "network unavailable",
            Self::NetworkFailure => "network failure",
            Self::PermissionFailure => "permission failure",
            Self::QuotaExceeded => "quota exceeded",
            Self::ZoneBusy => "zone busy",
            Self::ServiceUnavailable => "service unavailable",
            Self::RequestRateLimited => "request rate limited",
            Self::ServerRejectedRequest => "server rejected request",
            Self::InternalError => "internal error",
            Self::UserDeletedZone => "user deleted zone",
            Self::ChangeTokenExpired => "change token expired",
            Self::BadContainer => "bad container",
            Self::ServerRecordChanged => "server record changed",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A failed record store request
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Whether the device has a usable cloud account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Available,
    NoAccount,
    Restricted,
    CouldNotDetermine,
}

/// A record as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub record_type: String,
    pub record_id: RecordId,
    pub payload: serde_json::Value,
    pub modified_at: Timestamp,
}

impl RemoteRecord {
    /// Encodes a local record for upload
    pub fn from_record<T: SyncRecord>(record: &T) -> SyncResult<Self> {
        Ok(Self {
            record_type: T::KIND.record_type().to_string(),
            record_id: record.id(),
            payload: serde_json::to_value(record)?,
            modified_at: record.modified_at(),
        })
    }

    /// Decodes the payload back into a local record
    pub fn decode<T: SyncRecord>(&self) -> SyncResult<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            SyncError::InvalidData(format!(
                "{} {} does not decode: {}",
                self.record_type, self.record_id, e
            ))
        })
    }

    /// Hash comparable with `SyncRecord::content_hash`
    pub fn content_hash(&self) -> String {
        payload_hash(&self.payload)
    }
}

/// One page of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<RemoteRecord>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// Per-record result of a save or delete request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    pub succeeded: Vec<RecordId>,
    pub failed: Vec<(RecordId, RemoteErrorCode)>,
}

/// Managed cloud record store
///
/// A returned `Err` is a request-level (transport) failure. Per-record
/// rejections inside a successful request are reported in `WriteOutcome`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn account_status(&self) -> Result<AccountStatus, RemoteError>;

    /// Fetches up to `limit` records of `record_type` starting at `cursor`
    async fn query(
        &self,
        record_type: &str,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<RecordPage, RemoteError>;

    /// Creates or replaces records
    async fn save(
        &self,
        record_type: &str,
        records: Vec<RemoteRecord>,
    ) -> Result<WriteOutcome, RemoteError>;

    /// Deletes records by identifier
    async fn delete(&self, record_type: &str, ids: Vec<RecordId>)
        -> Result<WriteOutcome, RemoteError>;

    /// Registers a create/update/delete push subscription, returning its id
    async fn register_subscription(&self, record_type: &str) -> Result<String, RemoteError>;
}
