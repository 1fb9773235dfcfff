// crates/sync-engine/src/report.rs
//! Results of a sync pass

use crate::batch::BatchResult;
use crate::classify::ClassifiedError;
use crate::types::SyncScope;
use momentum_core::{EntityKind, Timestamp};

/// What happened to one entity kind
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub kind: EntityKind,
    /// Records read from the server
    pub downloaded: usize,
    /// Local records sent to the server
    pub uploaded: usize,
    /// Server versions written locally
    pub pulled: usize,
    pub deleted_local: usize,
    pub deleted_remote: usize,
    pub conflicts: usize,
    /// Server records that could not be decoded
    pub skipped: usize,
    pub upload_batches: Vec<BatchResult>,
    pub delete_batches: Vec<BatchResult>,
}

impl PhaseReport {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            downloaded: 0,
            uploaded: 0,
            pulled: 0,
            deleted_local: 0,
            deleted_remote: 0,
            conflicts: 0,
            skipped: 0,
            upload_batches: Vec::new(),
            delete_batches: Vec::new(),
        }
    }

    /// Records rejected individually by the server
    pub fn failed_records(&self) -> usize {
        self.upload_batches
            .iter()
            .chain(&self.delete_batches)
            .map(|b| b.failed.len())
            .sum()
    }
}

/// How a pass ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// All phases finished and no conflicts are pending
    Success,
    /// All phases finished; this many conflicts wait for a decision
    ConflictsPending(usize),
    /// A failure aborted the pass
    Failed(ClassifiedError),
    /// The account state could not be determined
    Unavailable,
    /// Another pass was already running
    Skipped,
}

/// Summary returned by `perform_full_sync`
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub scope: SyncScope,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub phases: Vec<PhaseReport>,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    pub(crate) fn new(scope: SyncScope) -> Self {
        let now = Timestamp::now();
        Self {
            scope,
            started_at: now,
            finished_at: now,
            phases: Vec::new(),
            outcome: SyncOutcome::Success,
        }
    }

    pub(crate) fn finish(mut self, outcome: SyncOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Timestamp::now();
        self
    }

    /// True when every phase ran
    pub fn is_complete(&self) -> bool {
        matches!(
            self.outcome,
            SyncOutcome::Success | SyncOutcome::ConflictsPending(_)
        )
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match &self.outcome {
            SyncOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn uploaded(&self) -> usize {
        self.phases.iter().map(|p| p.uploaded).sum()
    }

    pub fn downloaded(&self) -> usize {
        self.phases.iter().map(|p| p.downloaded).sum()
    }

    pub fn pulled(&self) -> usize {
        self.phases.iter().map(|p| p.pulled).sum()
    }

    pub fn conflicts(&self) -> usize {
        self.phases.iter().map(|p| p.conflicts).sum()
    }

    /// Every chunk result of the pass, uploads then deletes per phase
    pub fn batches(&self) -> impl Iterator<Item = &BatchResult> {
        self.phases
            .iter()
            .flat_map(|p| p.upload_batches.iter().chain(&p.delete_batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SyncErrorKind;

    #[test]
    fn test_report_totals() {
        let mut report = SyncReport::new(SyncScope::Planner);
        let mut tasks = PhaseReport::new(EntityKind::Task);
        tasks.uploaded = 3;
        tasks.pulled = 1;
        let mut goals = PhaseReport::new(EntityKind::Goal);
        goals.uploaded = 2;
        goals.conflicts = 1;
        report.phases = vec![tasks, goals];

        let report = report.finish(SyncOutcome::ConflictsPending(1));
        assert!(report.is_complete());
        assert_eq!(report.uploaded(), 5);
        assert_eq!(report.pulled(), 1);
        assert_eq!(report.conflicts(), 1);
        assert!(report.error().is_none());
    }

    #[test]
    fn test_failed_report() {
        let error = ClassifiedError::new(SyncErrorKind::NetworkIssue, "offline");
        let report = SyncReport::new(SyncScope::All).finish(SyncOutcome::Failed(error.clone()));
        assert!(!report.is_complete());
        assert_eq!(report.error(), Some(&error));
    }
}
