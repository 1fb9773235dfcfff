// crates/sync-engine/src/lib.rs
//! Conflict-aware batch synchronization
//!
//! Moves planner and finance records between the local store and a managed
//! cloud record store:
//! - Batched uploads, deletes and paged downloads
//! - Hash-based conflict detection against the last agreed version
//! - A persistent queue of conflicts awaiting a keep-local/keep-server choice
//! - Classification of failures into user-facing categories with follow-ups
//! - Cancellable automatic retries and periodic background sync
//!
//! # Example
//!
//! ```no_run
//! use momentum_store::{LocalStore, MemoryBackend};
//! use momentum_sync::{StoredRemote, SyncOptions, SyncOrchestrator};
//! use std::sync::Arc;
//!
//! # async fn run() -> momentum_sync::SyncResult<()> {
//! let store = LocalStore::new(Arc::new(MemoryBackend::new()));
//! let remote = Arc::new(StoredRemote::new(MemoryBackend::new()));
//! let orchestrator = SyncOrchestrator::open(store, remote, SyncOptions::default()).await?;
//!
//! let report = orchestrator.perform_full_sync().await;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

mod auto_sync;
mod batch;
mod classify;
mod conflict;
mod error;
mod ledger;
mod orchestrator;
mod remote;
mod report;
mod retry_plan;
mod stored_remote;
mod types;

pub use auto_sync::{AutoSync, MIN_INTERVAL};
pub use batch::{
    batches, transport_failure, BatchDownloader, BatchResult, BatchUploader, ProgressFn,
    DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE,
};
pub use classify::{classify, classify_code, ClassifiedError, FollowUp, SyncErrorKind};
pub use conflict::{
    decide, Conflict, ConflictChoice, ConflictQueue, ConflictType, Decision, RecordVersion,
};
pub use error::{SyncError, SyncResult};
pub use ledger::{SyncLedger, LEDGER_KEY};
pub use orchestrator::{SyncOrchestrator, STATE_KEY};
pub use remote::{
    AccountStatus, RecordPage, RemoteError, RemoteErrorCode, RemoteRecord, RemoteStore,
    WriteOutcome,
};
pub use report::{PhaseReport, SyncOutcome, SyncReport};
pub use retry_plan::RetryPlanner;
pub use stored_remote::{RemoteOp, StoredRemote};
pub use types::{SyncOptions, SyncScope, SyncSnapshot, SyncStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: SyncOptions = SyncOptions::default();
        let _: ConflictQueue = ConflictQueue::new();
        let _: SyncLedger = SyncLedger::new();
        let _: BatchUploader = BatchUploader::default();
        assert_eq!(SyncScope::default(), SyncScope::Planner);
    }
}
