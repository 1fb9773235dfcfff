// crates/sync-engine/src/stored_remote.rs
//! Record store kept in a key-value backend

use crate::batch::MAX_BATCH_SIZE;
use crate::remote::{
    AccountStatus, RecordPage, RemoteError, RemoteErrorCode, RemoteRecord, RemoteStore,
    WriteOutcome,
};
use async_trait::async_trait;
use momentum_core::RecordId;
use momentum_store::KeyValueBackend;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const SUBSCRIPTIONS_KEY: &str = "remote.subscriptions";

/// Remote operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    AccountStatus,
    Query,
    Save,
    Delete,
    Subscribe,
}

impl RemoteOp {
    const ALL: [RemoteOp; 5] = [
        RemoteOp::AccountStatus,
        RemoteOp::Query,
        RemoteOp::Save,
        RemoteOp::Delete,
        RemoteOp::Subscribe,
    ];

    fn index(self) -> usize {
        match self {
            Self::AccountStatus => 0,
            Self::Query => 1,
            Self::Save => 2,
            Self::Delete => 3,
            Self::Subscribe => 4,
        }
    }
}

/// A managed record store persisted through a [`KeyValueBackend`]
///
/// Records of each type live under `remote.<RecordType>`. Backed by a
/// `FileBackend` it serves as a local stand-in for the cloud service; backed
/// by a `MemoryBackend` it is a test double that counts calls and fails on
/// request.
pub struct StoredRemote<B: KeyValueBackend> {
    backend: B,
    account: Mutex<AccountStatus>,
    calls: [AtomicUsize; 5],
    failures: Mutex<HashMap<RemoteOp, VecDeque<RemoteError>>>,
    record_failures: Mutex<HashMap<RecordId, RemoteErrorCode>>,
    save_sizes: Mutex<Vec<usize>>,
    writes: tokio::sync::Mutex<()>,
}

impl<B: KeyValueBackend> StoredRemote<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            account: Mutex::new(AccountStatus::Available),
            calls: Default::default(),
            failures: Mutex::new(HashMap::new()),
            record_failures: Mutex::new(HashMap::new()),
            save_sizes: Mutex::new(Vec::new()),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn set_account_status(&self, status: AccountStatus) {
        if let Ok(mut account) = self.account.lock() {
            *account = status;
        }
    }

    /// Makes the next call of `op` fail with `code`
    ///
    /// Queued failures are consumed in order, one per call.
    pub fn fail_next(&self, op: RemoteOp, code: RemoteErrorCode) {
        if let Ok(mut failures) = self.failures.lock() {
            failures
                .entry(op)
                .or_default()
                .push_back(RemoteError::new(code, "injected failure"));
        }
    }

    /// Rejects `id` in every save or delete until cleared
    pub fn fail_record(&self, id: RecordId, code: RemoteErrorCode) {
        if let Ok(mut failures) = self.record_failures.lock() {
            failures.insert(id, code);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
        if let Ok(mut failures) = self.record_failures.lock() {
            failures.clear();
        }
    }

    /// Number of calls made to `op`, failed ones included
    pub fn calls(&self, op: RemoteOp) -> usize {
        self.calls[op.index()].load(Ordering::SeqCst)
    }

    /// Sizes of the save requests received so far, in order
    pub fn save_sizes(&self) -> Vec<usize> {
        self.save_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }

    pub fn reset_counters(&self) {
        for op in RemoteOp::ALL {
            self.calls[op.index()].store(0, Ordering::SeqCst);
        }
        if let Ok(mut sizes) = self.save_sizes.lock() {
            sizes.clear();
        }
    }

    /// Every stored record of `record_type`
    pub async fn records(&self, record_type: &str) -> Result<Vec<RemoteRecord>, RemoteError> {
        let bytes = self
            .backend
            .get(&records_key(record_type))
            .await
            .map_err(internal)?;
        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(internal),
        }
    }

    /// Writes a record directly, as another device would
    pub async fn put_record(&self, record: RemoteRecord) -> Result<(), RemoteError> {
        let _writes = self.writes.lock().await;
        let record_type = record.record_type.clone();
        let mut records = self.records(&record_type).await?;
        upsert(&mut records, record);
        self.store_records(&record_type, &records).await
    }

    /// Removes a record directly, as another device would
    pub async fn remove_record(&self, record_type: &str, id: RecordId) -> Result<bool, RemoteError> {
        let _writes = self.writes.lock().await;
        let mut records = self.records(record_type).await?;
        let before = records.len();
        records.retain(|r| r.record_id != id);
        self.store_records(record_type, &records).await?;
        Ok(records.len() != before)
    }

    /// Subscription ids by record type
    pub async fn subscriptions(&self) -> Result<BTreeMap<String, String>, RemoteError> {
        match self.backend.get(SUBSCRIPTIONS_KEY).await.map_err(internal)? {
            None => Ok(BTreeMap::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(internal),
        }
    }

    async fn store_records(
        &self,
        record_type: &str,
        records: &[RemoteRecord],
    ) -> Result<(), RemoteError> {
        let bytes = serde_json::to_vec(records).map_err(internal)?;
        self.backend
            .put(&records_key(record_type), &bytes)
            .await
            .map_err(internal)
    }

    /// Counts the call and returns the injected failure, if any
    fn begin(&self, op: RemoteOp) -> Result<(), RemoteError> {
        self.calls[op.index()].fetch_add(1, Ordering::SeqCst);
        let injected = match self.failures.lock() {
            Ok(mut failures) => failures.get_mut(&op).and_then(VecDeque::pop_front),
            Err(_) => None,
        };
        match injected {
            Some(error) => {
                log::debug!("Remote {:?} failing with {}", op, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn record_failure(&self, id: RecordId) -> Option<RemoteErrorCode> {
        self.record_failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(&id).copied())
    }

    fn check_batch(len: usize) -> Result<(), RemoteError> {
        if len > MAX_BATCH_SIZE {
            return Err(RemoteError::new(
                RemoteErrorCode::ServerRejectedRequest,
                format!("{} records exceeds the limit of {}", len, MAX_BATCH_SIZE),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<B: KeyValueBackend> RemoteStore for StoredRemote<B> {
    async fn account_status(&self) -> Result<AccountStatus, RemoteError> {
        self.begin(RemoteOp::AccountStatus)?;
        self.account
            .lock()
            .map(|account| *account)
            .map_err(|_| RemoteError::new(RemoteErrorCode::InternalError, "Lock poisoned"))
    }

    async fn query(
        &self,
        record_type: &str,
        cursor: Option<String>,
        limit: usize,
    ) -> Result<RecordPage, RemoteError> {
        self.begin(RemoteOp::Query)?;
        let offset = match cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                RemoteError::new(
                    RemoteErrorCode::ServerRejectedRequest,
                    format!("invalid cursor '{}'", cursor),
                )
            })?,
        };

        let records = self.records(record_type).await?;
        let end = records.len().min(offset.saturating_add(limit.max(1)));
        let page = records.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_cursor = (end < records.len()).then(|| end.to_string());

        Ok(RecordPage {
            records: page,
            next_cursor,
        })
    }

    async fn save(
        &self,
        record_type: &str,
        records: Vec<RemoteRecord>,
    ) -> Result<WriteOutcome, RemoteError> {
        self.begin(RemoteOp::Save)?;
        if let Ok(mut sizes) = self.save_sizes.lock() {
            sizes.push(records.len());
        }
        Self::check_batch(records.len())?;

        let _writes = self.writes.lock().await;
        let mut stored = self.records(record_type).await?;
        let mut outcome = WriteOutcome::default();
        for record in records {
            if let Some(code) = self.record_failure(record.record_id) {
                outcome.failed.push((record.record_id, code));
                continue;
            }
            outcome.succeeded.push(record.record_id);
            upsert(&mut stored, record);
        }
        self.store_records(record_type, &stored).await?;
        Ok(outcome)
    }

    async fn delete(
        &self,
        record_type: &str,
        ids: Vec<RecordId>,
    ) -> Result<WriteOutcome, RemoteError> {
        self.begin(RemoteOp::Delete)?;
        Self::check_batch(ids.len())?;

        let _writes = self.writes.lock().await;
        let mut stored = self.records(record_type).await?;
        let mut outcome = WriteOutcome::default();
        for id in ids {
            if let Some(code) = self.record_failure(id) {
                outcome.failed.push((id, code));
                continue;
            }
            stored.retain(|r| r.record_id != id);
            outcome.succeeded.push(id);
        }
        self.store_records(record_type, &stored).await?;
        Ok(outcome)
    }

    async fn register_subscription(&self, record_type: &str) -> Result<String, RemoteError> {
        self.begin(RemoteOp::Subscribe)?;

        let _writes = self.writes.lock().await;
        let mut subscriptions = self.subscriptions().await?;
        let id = subscriptions
            .entry(record_type.to_string())
            .or_insert_with(|| format!("{}-changes", record_type.to_lowercase()))
            .clone();
        let bytes = serde_json::to_vec(&subscriptions).map_err(internal)?;
        self.backend
            .put(SUBSCRIPTIONS_KEY, &bytes)
            .await
            .map_err(internal)?;
        Ok(id)
    }
}

fn records_key(record_type: &str) -> String {
    format!("remote.{}", record_type)
}

fn upsert(records: &mut Vec<RemoteRecord>, record: RemoteRecord) {
    match records.iter_mut().find(|r| r.record_id == record.record_id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

fn internal(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::new(RemoteErrorCode::InternalError, e.to_string())
}
