//! Key-value backends for collection blobs
//!
//! A backend stores opaque byte blobs under string keys. Collections never
//! touch files or SQL directly, which keeps them testable against
//! [`MemoryBackend`] and lets the remote stand-in reuse the same storage.

use async_trait::async_trait;
use momentum_core::{AppError, Result};
use momentum_database::{queries, DbPool};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Blob storage keyed by string
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Reads the blob under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes (or replaces) the blob under `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removes the blob under `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Lists every stored key in ascending order
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Backend shared between the local store, the ledger and the remote stand-in
pub type SharedBackend = Arc<dyn KeyValueBackend>;

fn lock_poisoned() -> AppError {
    AppError::InternalError {
        message: "Lock poisoned".to_string(),
    }
}

/// Volatile backend holding blobs in a map
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Creates an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}

/// One `<key>.json` file per key inside a directory
///
/// Writes go to a temporary file in the same directory and are renamed over
/// the target, so a crash never leaves a half-written blob behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

const FILE_SUFFIX: &str = ".json";

impl FileBackend {
    /// Opens (creating if needed) a backend rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            log::info!("Created data directory: {}", root.display());
        }
        Ok(Self { root })
    }

    /// Directory holding the blob files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(AppError::InvalidArgument {
                argument: "key".to_string(),
                reason: format!("'{}' is not a valid storage key", key),
            });
        }
        Ok(self.root.join(format!("{}{}", key, FILE_SUFFIX)))
    }

    fn write_atomic(&self, path: &Path, value: &[u8]) -> Result<()> {
        let mut temp_file = NamedTempFile::new_in(&self.root)?;
        temp_file.write_all(value)?;
        temp_file.flush()?;
        temp_file
            .persist(path)
            .map_err(|e| AppError::from(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        self.write_atomic(&path, value)?;
        log::trace!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(FILE_SUFFIX)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Blobs in the SQLite `blobs` table
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: DbPool,
}

impl SqliteBackend {
    /// Wraps a migrated pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens the database file at `path` and applies migrations
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = momentum_database::DatabaseConfig::file(path.as_ref());
        let pool = momentum_database::open(config).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl KeyValueBackend for SqliteBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        queries::get_blob(&self.pool, key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        queries::put_blob(&self.pool, key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        queries::delete_blob(&self.pool, key).await.map(|_| ())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        queries::list_keys(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn exercise(backend: &dyn KeyValueBackend) {
        assert_eq!(backend.get("momentum.tasks").await.unwrap(), None);

        backend.put("momentum.tasks", b"[]").await.unwrap();
        backend.put("momentum.goals", b"[1]").await.unwrap();
        backend.put("momentum.tasks", b"[2]").await.unwrap();

        assert_eq!(
            backend.get("momentum.tasks").await.unwrap(),
            Some(b"[2]".to_vec())
        );
        assert_eq!(
            backend.keys().await.unwrap(),
            vec!["momentum.goals".to_string(), "momentum.tasks".to_string()]
        );

        backend.remove("momentum.goals").await.unwrap();
        backend.remove("momentum.goals").await.unwrap();
        assert_eq!(backend.keys().await.unwrap(), vec!["momentum.tasks".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_backend() {
        exercise(&MemoryBackend::new()).await;
    }

    #[tokio::test]
    async fn test_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path().join("data")).unwrap();
        exercise(&backend).await;

        assert!(temp_dir.path().join("data/momentum.tasks.json").exists());
    }

    #[tokio::test]
    async fn test_file_backend_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();

        let result = backend.put("../escape", b"x").await;
        assert!(matches!(result, Err(AppError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_sqlite_backend() {
        let temp_dir = TempDir::new().unwrap();
        let backend = SqliteBackend::open(temp_dir.path().join("store.db"))
            .await
            .unwrap();
        exercise(&backend).await;
    }
}
