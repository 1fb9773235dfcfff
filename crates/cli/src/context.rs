// FILE: crates/cli/src/context.rs

use anyhow::{Context, Result};
use momentum_config::{Config, ConfigManager, ScopeSetting, StorageBackend};
use momentum_resilience::RetryPolicy;
use momentum_store::{DirtyKinds, FileBackend, LocalStore, SharedBackend, SqliteBackend};
use momentum_sync::{StoredRemote, SyncOptions, SyncOrchestrator, SyncScope};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs: settings, the local store and the remote
pub struct AppContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub remote_dir: PathBuf,
    pub store: LocalStore,
    dirty: Arc<DirtyKinds>,
}

impl AppContext {
    /// Loads the config (with env overrides) and opens the local store
    pub async fn load(manager: &ConfigManager) -> Result<Self> {
        let config = manager
            .load_with_env_overrides()
            .context("Failed to load configuration")?;
        let data_dir = manager.data_dir(&config);
        let remote_dir = manager.remote_dir(&config);
        Self::open(config, data_dir, remote_dir).await
    }

    /// Opens the local store described by `config` under `data_dir`
    pub async fn open(config: Config, data_dir: PathBuf, remote_dir: PathBuf) -> Result<Self> {
        let backend = open_backend(config.app.storage, &data_dir).await?;
        let dirty = Arc::new(DirtyKinds::new());
        let store = LocalStore::new(backend).with_trigger(dirty.clone());

        Ok(Self {
            config,
            data_dir,
            remote_dir,
            store,
            dirty,
        })
    }

    /// Sync settings from the config, optionally narrowed to `scope`
    pub fn sync_options(&self, scope: Option<SyncScope>) -> SyncOptions {
        let retry = &self.config.sync.retry;
        let policy = RetryPolicy::new(retry.max_attempts as usize)
            .with_initial_delay(retry.initial_delay())
            .with_max_delay(retry.max_delay())
            .with_multiplier(retry.multiplier);

        SyncOptions::default()
            .with_scope(scope.unwrap_or_else(|| scope_from(self.config.sync.scope)))
            .with_batch_size(self.config.sync.batch_size)
            .with_retry_policy(policy)
    }

    /// Orchestrator against the directory-backed remote, with restored state
    pub async fn orchestrator(&self, scope: Option<SyncScope>) -> Result<Arc<SyncOrchestrator>> {
        let remote_backend = FileBackend::open(&self.remote_dir).with_context(|| {
            format!("Failed to open remote directory {}", self.remote_dir.display())
        })?;
        let remote = Arc::new(StoredRemote::new(remote_backend));

        SyncOrchestrator::open(self.store.clone(), remote, self.sync_options(scope))
            .await
            .context("Failed to restore sync state")
    }

    /// Kinds written since the last call
    pub fn take_changed(&self) -> Vec<momentum_core::EntityKind> {
        self.dirty.take()
    }
}

/// Maps the configured scope onto the engine's scope
pub fn scope_from(setting: ScopeSetting) -> SyncScope {
    match setting {
        ScopeSetting::Planner => SyncScope::Planner,
        ScopeSetting::Finance => SyncScope::Finance,
        ScopeSetting::All => SyncScope::All,
    }
}

async fn open_backend(storage: StorageBackend, data_dir: &Path) -> Result<SharedBackend> {
    let backend: SharedBackend = match storage {
        StorageBackend::File => Arc::new(
            FileBackend::open(data_dir.join("local")).context("Failed to open data directory")?,
        ),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
            Arc::new(
                SqliteBackend::open(data_dir.join("momentum.db"))
                    .await
                    .context("Failed to open SQLite store")?,
            )
        }
    };
    log::debug!("Opened {} storage in {}", storage, data_dir.display());
    Ok(backend)
}
