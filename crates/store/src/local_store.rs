//! Store facade handed to the CLI and the sync orchestrator

use crate::backend::SharedBackend;
use crate::collection::{corrupt_key, Collection, LoadOutcome};
use momentum_core::{dispatch_kind, EntityKind, RecordId, Result, SyncRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Hook fired after a local mutation is saved
pub trait SyncTrigger: Send + Sync {
    fn records_changed(&self, kind: EntityKind);
}

/// Trigger that remembers which kinds changed since the last drain
#[derive(Debug, Default)]
pub struct DirtyKinds {
    kinds: Mutex<BTreeSet<EntityKind>>,
}

impl DirtyKinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and clears the changed kinds
    pub fn take(&self) -> Vec<EntityKind> {
        match self.kinds.lock() {
            Ok(mut kinds) => std::mem::take(&mut *kinds).into_iter().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.lock().map(|k| k.is_empty()).unwrap_or(true)
    }
}

impl SyncTrigger for DirtyKinds {
    fn records_changed(&self, kind: EntityKind) {
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.insert(kind);
        }
    }
}

/// Per-kind health of the local store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Record count for each kind that decoded cleanly (or has no data yet)
    pub counts: BTreeMap<EntityKind, usize>,
    /// Kinds whose stored blob could not be decoded
    pub corrupt: Vec<EntityKind>,
    /// Keys holding a preserved copy of an unreadable blob
    pub preserved: Vec<String>,
}

impl StoreStats {
    /// Total records across healthy collections
    pub fn total_records(&self) -> usize {
        self.counts.values().sum()
    }

    /// Kinds that are empty and healthy
    pub fn empty_kinds(&self) -> Vec<EntityKind> {
        self.counts
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Local record store
///
/// Cheap to clone; clones share the backend and trigger.
#[derive(Clone)]
pub struct LocalStore {
    backend: SharedBackend,
    trigger: Option<Arc<dyn SyncTrigger>>,
}

impl LocalStore {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            trigger: None,
        }
    }

    /// Fires `trigger` after every successful mutation
    pub fn with_trigger(mut self, trigger: Arc<dyn SyncTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Backend the collections are stored in
    pub fn backend(&self) -> SharedBackend {
        Arc::clone(&self.backend)
    }

    /// Loads the collection for `T`
    pub async fn collection<T: SyncRecord>(&self) -> Result<Collection<T>> {
        Collection::load(self.backend()).await
    }

    /// Adds a new record
    pub async fn add<T: SyncRecord>(&self, record: T) -> Result<()> {
        self.collection::<T>().await?.add(record).await?;
        self.notify(T::KIND);
        Ok(())
    }

    /// Replaces an existing record, bumping its modification time
    pub async fn update<T: SyncRecord>(&self, mut record: T) -> Result<()> {
        record.touch();
        self.collection::<T>().await?.update(record).await?;
        self.notify(T::KIND);
        Ok(())
    }

    /// Deletes a record by identifier
    pub async fn delete<T: SyncRecord>(&self, id: RecordId) -> Result<T> {
        let removed = self.collection::<T>().await?.delete(id).await?;
        self.notify(T::KIND);
        Ok(removed)
    }

    /// Finds a record by identifier
    pub async fn find<T: SyncRecord>(&self, id: RecordId) -> Result<Option<T>> {
        Ok(self.collection::<T>().await?.find(id).cloned())
    }

    /// Deletes a record of any kind, for callers that only know the kind at runtime
    pub async fn delete_kind(&self, kind: EntityKind, id: RecordId) -> Result<()> {
        dispatch_kind!(kind, |R| self.delete::<R>(id).await.map(drop))
    }

    /// Counts records per kind, keeping unreadable collections apart
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        for kind in EntityKind::all() {
            match self.load_outcome(kind).await? {
                LoadOutcome::Corrupt(_) => stats.corrupt.push(kind),
                LoadOutcome::Missing => {
                    stats.counts.insert(kind, 0);
                }
                LoadOutcome::Loaded(n) => {
                    stats.counts.insert(kind, n);
                }
            }
        }

        let keys = self.backend.keys().await?;
        stats.preserved = EntityKind::all()
            .iter()
            .map(|kind| corrupt_key(kind.storage_key()))
            .filter(|key| keys.contains(key))
            .collect();

        Ok(stats)
    }

    async fn load_outcome(&self, kind: EntityKind) -> Result<LoadOutcome> {
        dispatch_kind!(kind, |R| Ok(self.collection::<R>().await?.outcome().clone()))
    }

    fn notify(&self, kind: EntityKind) {
        if let Some(trigger) = &self.trigger {
            trigger.records_changed(kind);
        }
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("has_trigger", &self.trigger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyValueBackend, MemoryBackend};
    use momentum_core::{Goal, SavingsGoal, Task};

    fn store() -> LocalStore {
        LocalStore::new(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn test_trigger_fires_on_mutation() {
        let dirty = Arc::new(DirtyKinds::new());
        let store = store().with_trigger(dirty.clone());

        let task = Task::new("Trigger");
        store.add(task.clone()).await.unwrap();
        store.add(Goal::new("Trigger too")).await.unwrap();

        assert_eq!(dirty.take(), vec![EntityKind::Task, EntityKind::Goal]);
        assert!(dirty.is_empty());

        store.delete::<Task>(task.id).await.unwrap();
        assert_eq!(dirty.take(), vec![EntityKind::Task]);
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_trigger() {
        let dirty = Arc::new(DirtyKinds::new());
        let store = store().with_trigger(dirty.clone());

        assert!(store.delete::<Task>(RecordId::new()).await.is_err());
        assert!(dirty.is_empty());
    }

    #[tokio::test]
    async fn test_update_touches_record() {
        let store = store();
        let task = Task::new("Original");
        store.add(task.clone()).await.unwrap();

        let mut edited = task.clone();
        edited.title = "Edited".to_string();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.update(edited).await.unwrap();

        let stored: Task = store.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Edited");
        assert!(stored.modified_at > task.modified_at);
    }

    #[tokio::test]
    async fn test_delete_kind_dispatch() {
        let store = store();
        let goal = SavingsGoal::new("Holiday", momentum_core::Money::from_cents(150_000));
        store.add(goal.clone()).await.unwrap();

        store.delete_kind(EntityKind::SavingsGoal, goal.id).await.unwrap();
        assert!(store.collection::<SavingsGoal>().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_separate_corrupt_from_empty() {
        let store = store();
        store.add(Task::new("Counted")).await.unwrap();
        store
            .backend()
            .put(EntityKind::Goal.storage_key(), b"\x00\x01")
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.counts.get(&EntityKind::Task), Some(&1));
        assert_eq!(stats.counts.get(&EntityKind::Goal), None);
        assert_eq!(stats.corrupt, vec![EntityKind::Goal]);
        assert!(stats.empty_kinds().contains(&EntityKind::Budget));
        assert!(!stats.empty_kinds().contains(&EntityKind::Goal));
        assert_eq!(stats.total_records(), 1);
    }
}
