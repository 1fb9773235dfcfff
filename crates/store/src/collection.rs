//! Typed per-entity collections

use crate::backend::SharedBackend;
use momentum_core::{AppError, RecordId, Result, SyncRecord};
use std::fmt;

/// What `Collection::load` found under the collection key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet
    Missing,
    /// Decoded this many records
    Loaded(usize),
    /// A blob exists but could not be decoded; the collection starts empty
    Corrupt(String),
}

impl LoadOutcome {
    /// Returns true when stored data was unreadable
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::Loaded(n) => write!(f, "loaded {}", n),
            Self::Corrupt(reason) => write!(f, "corrupt ({})", reason),
        }
    }
}

/// Key receiving a copy of an unreadable blob before it is overwritten
pub fn corrupt_key(key: &str) -> String {
    format!("{}.corrupt", key)
}

/// All records of one entity kind, held in memory and saved wholesale
pub struct Collection<T: SyncRecord> {
    backend: SharedBackend,
    records: Vec<T>,
    outcome: LoadOutcome,
    unreadable: Option<Vec<u8>>,
}

impl<T: SyncRecord> Collection<T> {
    /// Storage key for this collection
    pub fn key() -> &'static str {
        T::KIND.storage_key()
    }

    /// Loads the collection from `backend`
    ///
    /// Malformed data yields an empty collection with a `Corrupt` outcome.
    /// Only backend I/O failures are returned as errors.
    pub async fn load(backend: SharedBackend) -> Result<Self> {
        let key = Self::key();
        let (records, outcome, unreadable) = match backend.get(key).await? {
            None => (Vec::new(), LoadOutcome::Missing, None),
            Some(bytes) => match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(records) => {
                    let n = records.len();
                    (records, LoadOutcome::Loaded(n), None)
                }
                Err(e) => {
                    log::warn!("Collection '{}' is unreadable, starting empty: {}", key, e);
                    (Vec::new(), LoadOutcome::Corrupt(e.to_string()), Some(bytes))
                }
            },
        };

        Ok(Self {
            backend,
            records,
            outcome,
            unreadable,
        })
    }

    /// Writes the whole collection back to the backend
    pub async fn save(&mut self) -> Result<()> {
        let key = Self::key();
        if let Some(bytes) = self.unreadable.take() {
            let target = corrupt_key(key);
            self.backend.put(&target, &bytes).await?;
            log::warn!("Preserved unreadable '{}' as '{}'", key, target);
        }

        let encoded = serde_json::to_vec(&self.records)?;
        self.backend.put(key, &encoded).await?;
        log::debug!("Saved {} {} records", self.records.len(), T::KIND);
        Ok(())
    }

    /// Result of the most recent load
    pub fn outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    /// All records in stored order
    pub fn all(&self) -> &[T] {
        &self.records
    }

    /// Finds a record by identifier
    pub fn find(&self, id: RecordId) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a new record and saves
    pub async fn add(&mut self, record: T) -> Result<()> {
        if self.find(record.id()).is_some() {
            return Err(AppError::DuplicateRecord {
                entity: T::KIND.to_string(),
                identifier: record.id().to_string(),
            });
        }
        self.records.push(record);
        self.save().await
    }

    /// Replaces the record with the same identifier and saves
    pub async fn update(&mut self, record: T) -> Result<()> {
        let slot = self
            .records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| AppError::not_found(T::KIND.to_string(), record.id()))?;
        *slot = record;
        self.save().await
    }

    /// Removes a record by identifier and saves, returning the removed record
    pub async fn delete(&mut self, id: RecordId) -> Result<T> {
        let index = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| AppError::not_found(T::KIND.to_string(), id))?;
        let removed = self.records.remove(index);
        self.save().await?;
        Ok(removed)
    }

    /// Replaces every record at once and saves
    pub async fn replace_all(&mut self, records: Vec<T>) -> Result<()> {
        self.records = records;
        self.save().await
    }
}

impl<T: SyncRecord + fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &T::KIND)
            .field("records", &self.records)
            .field("outcome", &self.outcome)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{KeyValueBackend, MemoryBackend};
    use momentum_core::Task;
    use std::sync::Arc;

    fn backend() -> SharedBackend {
        Arc::new(MemoryBackend::new())
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let tasks = Collection::<Task>::load(backend()).await.unwrap();
        assert!(tasks.is_empty());
        assert_eq!(tasks.outcome(), &LoadOutcome::Missing);
    }

    #[tokio::test]
    async fn test_add_persists() {
        let backend = backend();
        let mut tasks = Collection::<Task>::load(backend.clone()).await.unwrap();
        let task = Task::new("Buy milk");
        tasks.add(task.clone()).await.unwrap();

        let reloaded = Collection::<Task>::load(backend).await.unwrap();
        assert_eq!(reloaded.all(), &[task]);
        assert_eq!(reloaded.outcome(), &LoadOutcome::Loaded(1));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_id() {
        let mut tasks = Collection::<Task>::load(backend()).await.unwrap();
        let task = Task::new("Once");
        tasks.add(task.clone()).await.unwrap();

        let result = tasks.add(task).await;
        assert!(matches!(result, Err(AppError::DuplicateRecord { .. })));
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown() {
        let mut tasks = Collection::<Task>::load(backend()).await.unwrap();
        let task = Task::new("Ghost");

        assert!(matches!(
            tasks.update(task.clone()).await,
            Err(AppError::RecordNotFound { .. })
        ));
        assert!(matches!(
            tasks.delete(task.id).await,
            Err(AppError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_in_place() {
        let mut tasks = Collection::<Task>::load(backend()).await.unwrap();
        let first = Task::new("First");
        let second = Task::new("Second");
        tasks.add(first.clone()).await.unwrap();
        tasks.add(second.clone()).await.unwrap();

        let mut edited = first.clone();
        edited.title = "First, edited".to_string();
        tasks.update(edited).await.unwrap();

        assert_eq!(tasks.all()[0].title, "First, edited");
        assert_eq!(tasks.all()[1].id, second.id);
    }

    #[tokio::test]
    async fn test_malformed_blob_loads_empty() {
        let backend = backend();
        backend.put(Collection::<Task>::key(), b"{not json").await.unwrap();

        let tasks = Collection::<Task>::load(backend).await.unwrap();
        assert!(tasks.is_empty());
        assert!(tasks.outcome().is_corrupt());
    }

    #[tokio::test]
    async fn test_save_preserves_unreadable_blob() {
        let backend = backend();
        let key = Collection::<Task>::key();
        backend.put(key, b"garbage").await.unwrap();

        let mut tasks = Collection::<Task>::load(backend.clone()).await.unwrap();
        tasks.add(Task::new("Fresh start")).await.unwrap();

        assert_eq!(
            backend.get(&corrupt_key(key)).await.unwrap(),
            Some(b"garbage".to_vec())
        );
        let reloaded = Collection::<Task>::load(backend).await.unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
