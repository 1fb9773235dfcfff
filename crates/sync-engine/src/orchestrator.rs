// crates/sync-engine/src/orchestrator.rs
//! Runs sync passes between the local store and the remote store

use crate::batch::{transport_failure, BatchDownloader, BatchUploader, ProgressFn};
use crate::classify::{classify, ClassifiedError, FollowUp, SyncErrorKind};
use crate::conflict::{decide, Conflict, ConflictChoice, ConflictQueue, Decision, RecordVersion};
use crate::error::{SyncError, SyncResult};
use crate::ledger::SyncLedger;
use crate::remote::{AccountStatus, RemoteError, RemoteRecord, RemoteStore, WriteOutcome};
use crate::report::{PhaseReport, SyncOutcome, SyncReport};
use crate::retry_plan::RetryPlanner;
use crate::types::{SyncOptions, SyncScope, SyncSnapshot, SyncStatus};
use momentum_core::{dispatch_kind, AppError, EntityKind, RecordId, SyncRecord, Timestamp};
use momentum_resilience::{RetryScheduler, Timeout};
use momentum_store::LocalStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Backend key holding the orchestrator's persisted state
pub const STATE_KEY: &str = "momentum.sync.state";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    last_successful_sync: Option<Timestamp>,
    conflicts: Vec<Conflict>,
    reduced_scope_pending: bool,
}

/// Marks a pass or resolution as running for as long as it lives
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates full sync passes, conflict resolution and automatic retries
///
/// Both stores are injected. The orchestrator publishes a [`SyncSnapshot`]
/// after every state change; UIs observe it through [`subscribe`].
///
/// [`subscribe`]: SyncOrchestrator::subscribe
pub struct SyncOrchestrator {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    options: SyncOptions,
    queue: ConflictQueue,
    snapshot: watch::Sender<SyncSnapshot>,
    running: AtomicBool,
    reduced_scope: AtomicBool,
    planner: Mutex<RetryPlanner>,
    scheduler: RetryScheduler,
}

impl SyncOrchestrator {
    /// Creates an orchestrator with empty state
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteStore>, options: SyncOptions) -> Self {
        let (snapshot, _) = watch::channel(SyncSnapshot::default());
        Self {
            store,
            remote,
            planner: Mutex::new(RetryPlanner::new(options.retry_policy.clone())),
            options,
            queue: ConflictQueue::new(),
            snapshot,
            running: AtomicBool::new(false),
            reduced_scope: AtomicBool::new(false),
            scheduler: RetryScheduler::new(),
        }
    }

    /// Creates an orchestrator and restores its persisted state
    pub async fn open(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        options: SyncOptions,
    ) -> SyncResult<Arc<Self>> {
        let orchestrator = Arc::new(Self::new(store, remote, options));
        orchestrator.load_state().await?;
        Ok(orchestrator)
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot.subscribe()
    }

    /// Pending conflicts in detection order
    pub fn conflicts(&self) -> SyncResult<Vec<Conflict>> {
        self.queue.list()
    }

    pub fn is_syncing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns true if the next pass is limited to planner data
    pub fn reduced_scope_pending(&self) -> bool {
        self.reduced_scope.load(Ordering::SeqCst)
    }

    /// Clears the alert flag once the UI has shown it
    pub fn dismiss_alert(&self) {
        self.publish(|s| s.show_alert = false);
    }

    pub fn has_pending_retry(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Time until the pending retry fires
    pub fn pending_retry_delay(&self) -> Option<Duration> {
        self.scheduler.remaining()
    }

    /// Cancels the scheduled retry, returning whether one was waiting
    pub fn cancel_pending_retry(&self) -> bool {
        self.scheduler.cancel()
    }

    /// Restores the last sync time, pending conflicts and scope request
    pub async fn load_state(&self) -> SyncResult<()> {
        let state = match self.store.backend().get(STATE_KEY).await? {
            None => PersistedState::default(),
            Some(bytes) => match serde_json::from_slice::<PersistedState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Sync state unreadable, starting fresh: {}", e);
                    PersistedState::default()
                }
            },
        };

        self.queue.clear()?;
        for conflict in state.conflicts {
            self.queue.enqueue(conflict)?;
        }
        self.reduced_scope
            .store(state.reduced_scope_pending, Ordering::SeqCst);

        let conflicts = self.queue.list()?;
        log::debug!(
            "Loaded sync state: {} pending conflicts, last sync {:?}",
            conflicts.len(),
            state.last_successful_sync
        );
        self.publish(|s| {
            s.last_sync = state.last_successful_sync;
            if !conflicts.is_empty() {
                s.status = SyncStatus::ConflictResolutionNeeded;
            }
            s.conflicts = conflicts;
        });
        Ok(())
    }

    /// Runs one full pass over the configured scope
    ///
    /// A request made while another pass or a resolution is running returns a
    /// `Skipped` report without touching either store. Failures are reported
    /// through the returned report and the published snapshot.
    pub async fn perform_full_sync(self: &Arc<Self>) -> SyncReport {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            log::info!("Sync already in progress, skipping request");
            return SyncReport::new(self.options.scope).finish(SyncOutcome::Skipped);
        };

        let scope = if self.reduced_scope.swap(false, Ordering::SeqCst) {
            log::info!("Running reduced planner-only sync");
            SyncScope::Planner
        } else {
            self.options.scope
        };

        let report = self.run_sync(scope).await;
        log::info!(
            "Sync finished: {:?} ({} uploaded, {} pulled, {} conflicts)",
            report.outcome,
            report.uploaded(),
            report.pulled(),
            report.conflicts()
        );
        report
    }

    /// Starts a new connectivity epoch and syncs
    pub async fn connectivity_restored(self: &Arc<Self>) -> SyncReport {
        log::info!("Connectivity restored");
        self.with_planner(RetryPlanner::connectivity_restored);
        self.perform_full_sync().await
    }

    /// Registers a change subscription for every record type in scope
    pub async fn register_subscriptions(&self) -> SyncResult<Vec<String>> {
        let mut ids = Vec::new();
        for kind in self.options.scope.kinds() {
            let id = self.remote.register_subscription(kind.record_type()).await?;
            log::info!("Subscribed to {} changes as {}", kind.record_type(), id);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Applies the chosen side of a pending conflict to the other side
    pub async fn resolve_conflict(
        &self,
        conflict_id: &str,
        choice: ConflictChoice,
    ) -> SyncResult<()> {
        let Some(_running) = RunningGuard::acquire(&self.running) else {
            return Err(SyncError::AlreadyInProgress);
        };

        let conflict = self.queue.get(conflict_id)?;
        let agreed = dispatch_kind!(conflict.kind, |R| self
            .apply_choice::<R>(&conflict, choice)
            .await)?;

        let backend = self.store.backend();
        let mut ledger = SyncLedger::load(&*backend).await?;
        match agreed {
            Some(hash) => ledger.record(conflict.kind, conflict.record_id, hash),
            None => ledger.forget(conflict.kind, conflict.record_id),
        }
        ledger.save(&*backend).await?;

        self.queue.remove(conflict_id)?;
        log::info!(
            "Resolved {} conflict on {} {} with {:?}",
            conflict.conflict_type,
            conflict.kind,
            conflict.record_id,
            choice
        );

        let conflicts = self.queue.list()?;
        self.publish(|s| {
            if conflicts.is_empty() && s.status == SyncStatus::ConflictResolutionNeeded {
                s.status = SyncStatus::Success;
            }
            s.conflicts = conflicts;
        });
        self.persist_state().await
    }

    /// Writes the chosen version, returning the agreed hash or `None` when
    /// the record no longer exists on either side
    async fn apply_choice<T: SyncRecord>(
        &self,
        conflict: &Conflict,
        choice: ConflictChoice,
    ) -> SyncResult<Option<String>> {
        let record_type = T::KIND.record_type();
        let id = conflict.record_id;

        match (choice, conflict.chosen(choice)) {
            (
                ConflictChoice::KeepLocal,
                RecordVersion::Present {
                    payload,
                    hash,
                    modified_at,
                },
            ) => {
                let record = RemoteRecord {
                    record_type: record_type.to_string(),
                    record_id: id,
                    payload: payload.clone(),
                    modified_at: *modified_at,
                };
                let outcome = self.remote.save(record_type, vec![record]).await?;
                ensure_written(&outcome, id)?;
                Ok(Some(hash.clone()))
            }
            (ConflictChoice::KeepLocal, RecordVersion::Tombstone) => {
                let outcome = self.remote.delete(record_type, vec![id]).await?;
                ensure_written(&outcome, id)?;
                Ok(None)
            }
            (ConflictChoice::KeepServer, RecordVersion::Present { payload, hash, .. }) => {
                let record: T = serde_json::from_value(payload.clone())
                    .map_err(|e| SyncError::InvalidData(format!("{} {}: {}", record_type, id, e)))?;
                let mut collection = self.store.collection::<T>().await?;
                if collection.find(id).is_some() {
                    collection.update(record).await?;
                } else {
                    collection.add(record).await?;
                }
                Ok(Some(hash.clone()))
            }
            (ConflictChoice::KeepServer, RecordVersion::Tombstone) => {
                let mut collection = self.store.collection::<T>().await?;
                if collection.find(id).is_some() {
                    collection.delete(id).await?;
                }
                Ok(None)
            }
        }
    }

    async fn run_sync(self: &Arc<Self>, scope: SyncScope) -> SyncReport {
        let mut report = SyncReport::new(scope);
        log::info!("Starting {} sync", scope);
        self.publish(|s| {
            s.status = SyncStatus::Syncing;
            s.progress = 0.0;
        });

        match self.remote.account_status().await {
            Ok(AccountStatus::Available) => {}
            Ok(AccountStatus::NoAccount) => {
                let error = ClassifiedError::new(
                    SyncErrorKind::NotSignedIn,
                    "no cloud account is signed in",
                );
                return self.fail(report, error).await;
            }
            Ok(AccountStatus::Restricted) => {
                let error = ClassifiedError::new(
                    SyncErrorKind::PermissionDenied,
                    "cloud access is restricted on this device",
                );
                return self.fail(report, error).await;
            }
            Ok(AccountStatus::CouldNotDetermine) => {
                log::warn!("Cloud account status could not be determined");
                self.publish(|s| s.status = SyncStatus::TemporarilyUnavailable);
                return report.finish(SyncOutcome::Unavailable);
            }
            Err(e) => return self.fail(report, classify(&SyncError::Remote(e))).await,
        }

        let backend = self.store.backend();
        let mut ledger = match SyncLedger::load(&*backend).await {
            Ok(ledger) => ledger,
            Err(e) => return self.fail(report, classify(&e)).await,
        };

        let kinds = scope.kinds();
        let total = kinds.len();
        for (index, kind) in kinds.into_iter().enumerate() {
            log::debug!("Sync phase {}/{}: {}", index + 1, total, kind);
            let advance = |fraction: f64| {
                self.publish(|s| s.progress = (index as f64 + fraction) / total as f64)
            };

            let mut phase = PhaseReport::new(kind);
            let result = self.sync_phase(kind, &mut ledger, &mut phase, &advance).await;
            log::info!(
                "{}: {} downloaded, {} uploaded, {} pulled, {} deleted here, {} deleted remotely, {} conflicts",
                kind,
                phase.downloaded,
                phase.uploaded,
                phase.pulled,
                phase.deleted_local,
                phase.deleted_remote,
                phase.conflicts
            );
            report.phases.push(phase);

            if let Err(error) = result {
                if let Err(e) = ledger.save(&*backend).await {
                    log::error!("Failed to save sync ledger: {}", e);
                }
                return self.fail(report, error).await;
            }
            self.publish(|s| s.progress = (index + 1) as f64 / total as f64);
        }

        if let Err(e) = ledger.save(&*backend).await {
            return self.fail(report, classify(&e)).await;
        }
        self.succeed(report).await
    }

    async fn sync_phase(
        &self,
        kind: EntityKind,
        ledger: &mut SyncLedger,
        phase: &mut PhaseReport,
        progress: ProgressFn<'_>,
    ) -> Result<(), ClassifiedError> {
        dispatch_kind!(kind, |R| self.sync_kind::<R>(ledger, phase, progress).await)
    }

    async fn sync_kind<T: SyncRecord>(
        &self,
        ledger: &mut SyncLedger,
        phase: &mut PhaseReport,
        progress: ProgressFn<'_>,
    ) -> Result<(), ClassifiedError> {
        let kind = T::KIND;
        let record_type = kind.record_type();
        let timeout = Timeout::new(self.options.request_timeout);

        let server: BTreeMap<RecordId, RemoteRecord> = BatchDownloader::new(self.options.batch_size)
            .with_timeout(timeout)
            .download(self.remote.as_ref(), record_type)
            .await
            .map_err(|e| classify(&e))?
            .into_iter()
            .map(|r| (r.record_id, r))
            .collect();
        phase.downloaded = server.len();

        let mut collection = self.store.collection::<T>().await.map_err(local_failure)?;
        let fresh = collection.outcome().is_corrupt();
        if fresh {
            log::warn!(
                "Local {} data was unreadable, treating server records as new",
                kind
            );
        }
        let local: BTreeMap<RecordId, &T> = collection.all().iter().map(|r| (r.id(), r)).collect();

        // Local order first so the merged collection keeps it
        let mut ids: Vec<RecordId> = collection.all().iter().map(|r| r.id()).collect();
        let mut seen: BTreeSet<RecordId> = ids.iter().copied().collect();
        for id in server.keys().copied().chain(ledger.ids(kind)) {
            if seen.insert(id) {
                ids.push(id);
            }
        }

        let mut merged: Vec<T> = collection.all().to_vec();
        let mut pulled = Vec::new();
        let mut removed = Vec::new();
        let mut uploads = Vec::new();
        let mut upload_hashes = BTreeMap::new();
        let mut deletions = Vec::new();

        for id in ids {
            let local_record = local.get(&id).copied();
            let server_record = server.get(&id);
            let local_hash = local_record
                .map(|r| r.content_hash())
                .transpose()
                .map_err(local_failure)?;
            let server_hash = server_record.map(RemoteRecord::content_hash);
            let base = if fresh { None } else { ledger.base(kind, id) };
            let decision = decide(base, local_hash.as_deref(), server_hash.as_deref());

            if !matches!(decision, Decision::Conflict(_)) {
                self.drop_stale_conflict(kind, id);
            }

            match decision {
                Decision::InSync => {
                    if let Some(hash) = local_hash {
                        ledger.record(kind, id, hash);
                    }
                }
                Decision::Gone => ledger.forget(kind, id),
                Decision::PushLocal => {
                    if let (Some(record), Some(hash)) = (local_record, local_hash) {
                        uploads.push(RemoteRecord::from_record(record).map_err(|e| classify(&e))?);
                        upload_hashes.insert(id, hash);
                    }
                }
                Decision::PullServer => {
                    let Some(remote) = server_record else { continue };
                    match remote.decode::<T>() {
                        Ok(record) => {
                            match merged.iter_mut().find(|r| r.id() == id) {
                                Some(existing) => *existing = record,
                                None => merged.push(record),
                            }
                            pulled.push((id, remote.content_hash()));
                        }
                        Err(e) => {
                            log::warn!("Skipping server record: {}", e);
                            phase.skipped += 1;
                        }
                    }
                }
                Decision::DeleteLocal => {
                    merged.retain(|r| r.id() != id);
                    removed.push(id);
                }
                Decision::DeleteServer => deletions.push(id),
                Decision::Conflict(conflict_type) => {
                    let local_version =
                        RecordVersion::from_local(local_record).map_err(|e| classify(&e))?;
                    let conflict = Conflict::new(
                        kind,
                        id,
                        conflict_type,
                        local_version,
                        RecordVersion::from_remote(server_record),
                    );
                    self.queue.enqueue(conflict).map_err(|e| classify(&e))?;
                    log::info!("{} conflict on {} {}", conflict_type, kind, id);
                    phase.conflicts += 1;
                }
            }
        }

        phase.pulled = pulled.len();
        phase.deleted_local = removed.len();
        if !pulled.is_empty() || !removed.is_empty() {
            collection.replace_all(merged).await.map_err(local_failure)?;
            for (id, hash) in pulled {
                ledger.record(kind, id, hash);
            }
            for id in removed {
                ledger.forget(kind, id);
            }
        }

        let uploader = BatchUploader::new(self.options.batch_size)
            .with_retry_policy(self.options.chunk_retry.clone())
            .with_timeout(timeout);

        let results = uploader
            .upload(self.remote.as_ref(), record_type, &uploads, Some(progress))
            .await;
        for id in results.iter().flat_map(|r| &r.succeeded) {
            if let Some(hash) = upload_hashes.remove(id) {
                ledger.record(kind, *id, hash);
            }
        }
        phase.uploaded = results.iter().map(|r| r.succeeded.len()).sum();
        let failure = transport_failure(&results).cloned();
        phase.upload_batches = results;
        if let Some(error) = failure {
            return Err(error);
        }

        let results = uploader
            .delete(self.remote.as_ref(), record_type, &deletions)
            .await;
        for id in results.iter().flat_map(|r| &r.succeeded) {
            ledger.forget(kind, *id);
        }
        phase.deleted_remote = results.iter().map(|r| r.succeeded.len()).sum();
        let failure = transport_failure(&results).cloned();
        phase.delete_batches = results;

        if phase.failed_records() > 0 {
            log::warn!(
                "{} {} records were rejected and will be retried next sync",
                phase.failed_records(),
                kind
            );
        }
        failure.map_or(Ok(()), Err)
    }

    fn drop_stale_conflict(&self, kind: EntityKind, id: RecordId) {
        if let Some(conflict) = self.queue.find_record(kind, id) {
            log::info!("Conflict on {} {} no longer applies", kind, id);
            if let Err(e) = self.queue.remove(&conflict.id) {
                log::warn!("Failed to drop conflict {}: {}", conflict.id, e);
            }
        }
    }

    async fn succeed(&self, report: SyncReport) -> SyncReport {
        self.with_planner(RetryPlanner::record_success);
        self.scheduler.cancel();

        let conflicts = self.queue.list().unwrap_or_default();
        let pending = conflicts.len();
        let now = Timestamp::now();
        self.publish(|s| {
            s.status = if conflicts.is_empty() {
                SyncStatus::Success
            } else {
                SyncStatus::ConflictResolutionNeeded
            };
            s.last_sync = Some(now);
            s.progress = 1.0;
            s.last_error = None;
            s.show_alert = false;
            s.conflicts = conflicts;
        });
        self.save_state().await;

        let outcome = if pending == 0 {
            SyncOutcome::Success
        } else {
            SyncOutcome::ConflictsPending(pending)
        };
        report.finish(outcome)
    }

    async fn fail(self: &Arc<Self>, report: SyncReport, error: ClassifiedError) -> SyncReport {
        log::error!("Sync failed: {}", error);
        self.follow_up(&error).await;

        let conflicts = self.queue.list().unwrap_or_default();
        let published = error.clone();
        self.publish(|s| {
            s.status = SyncStatus::Error(published.kind);
            s.last_error = Some(published);
            s.show_alert = true;
            s.conflicts = conflicts;
        });
        self.save_state().await;
        report.finish(SyncOutcome::Failed(error))
    }

    async fn follow_up(self: &Arc<Self>, error: &ClassifiedError) {
        match error.kind.follow_up() {
            FollowUp::RetryOnce | FollowUp::RetryWithBackoff => {
                match self.with_planner(|planner| planner.plan(error.kind)).flatten() {
                    Some(delay) => self.schedule_retry(delay, error.kind),
                    None => log::info!("No automatic retry left after {}", error.kind),
                }
            }
            FollowUp::ResetLedger => {
                log::warn!("Cloud account changed, resetting sync history");
                if let Err(e) = SyncLedger::new().save(&*self.store.backend()).await {
                    log::error!("Failed to reset sync ledger: {}", e);
                }
                if let Err(e) = self.queue.clear() {
                    log::error!("Failed to clear conflicts: {}", e);
                }
            }
            FollowUp::ReduceScope => {
                log::warn!("Cloud storage full, next sync covers planner data only");
                self.reduced_scope.store(true, Ordering::SeqCst);
            }
            FollowUp::None => {}
        }
    }

    /// Kept out of the async call chain so `perform_full_sync` can spawn itself
    fn schedule_retry(self: &Arc<Self>, delay: Duration, kind: SyncErrorKind) {
        let this = Arc::clone(self);
        self.scheduler
            .schedule(delay, format!("retry after {}", kind), async move {
                tokio::spawn(async move {
                    this.perform_full_sync().await;
                });
            });
    }

    async fn save_state(&self) {
        if let Err(e) = self.persist_state().await {
            log::error!("Failed to save sync state: {}", e);
        }
    }

    async fn persist_state(&self) -> SyncResult<()> {
        let state = PersistedState {
            last_successful_sync: self.snapshot.borrow().last_sync,
            conflicts: self.queue.list()?,
            reduced_scope_pending: self.reduced_scope.load(Ordering::SeqCst),
        };
        let bytes = serde_json::to_vec(&state)?;
        self.store.backend().put(STATE_KEY, &bytes).await?;
        Ok(())
    }

    fn publish(&self, update: impl FnOnce(&mut SyncSnapshot)) {
        self.snapshot.send_modify(update);
    }

    fn with_planner<R>(&self, f: impl FnOnce(&mut RetryPlanner) -> R) -> Option<R> {
        match self.planner.lock() {
            Ok(mut planner) => Some(f(&mut planner)),
            Err(_) => {
                log::error!("Retry planner lock poisoned");
                None
            }
        }
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("options", &self.options)
            .field("status", &self.snapshot.borrow().status)
            .field("conflicts", &self.queue.len())
            .finish()
    }
}

fn local_failure(e: AppError) -> ClassifiedError {
    classify(&SyncError::Store(e))
}

fn ensure_written(outcome: &WriteOutcome, id: RecordId) -> SyncResult<()> {
    match outcome.failed.iter().find(|(failed, _)| *failed == id) {
        Some((_, code)) => Err(SyncError::Remote(RemoteError::new(
            *code,
            format!("record {} was rejected", id),
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stored_remote::StoredRemote;
    use momentum_store::MemoryBackend;

    fn orchestrator() -> Arc<SyncOrchestrator> {
        let store = LocalStore::new(Arc::new(MemoryBackend::new()));
        let remote = Arc::new(StoredRemote::new(MemoryBackend::new()));
        Arc::new(SyncOrchestrator::new(store, remote, SyncOptions::default()))
    }

    #[test]
    fn test_running_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = RunningGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(RunningGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(RunningGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_new_orchestrator_is_idle() {
        let orchestrator = orchestrator();
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Idle);
        assert!(snapshot.last_sync.is_none());
        assert!(!orchestrator.has_pending_retry());
        assert!(!orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_empty_sync_succeeds() {
        let orchestrator = orchestrator();
        let report = orchestrator.perform_full_sync().await;

        assert_eq!(report.outcome, SyncOutcome::Success);
        assert_eq!(report.phases.len(), 4);
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.status, SyncStatus::Success);
        assert_eq!(snapshot.progress, 1.0);
        assert!(snapshot.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_resolve_unknown_conflict() {
        let orchestrator = orchestrator();
        let result = orchestrator
            .resolve_conflict("missing", ConflictChoice::KeepLocal)
            .await;
        assert!(matches!(result, Err(SyncError::ConflictNotFound(_))));
    }

    #[tokio::test]
    async fn test_dismiss_alert() {
        let orchestrator = orchestrator();
        orchestrator.publish(|s| s.show_alert = true);
        orchestrator.dismiss_alert();
        assert!(!orchestrator.snapshot().show_alert);
    }
}
