//! Momentum Local Store
//!
//! Every entity kind lives in one collection, encoded as a JSON array and
//! stored as a single blob under a fixed key. Blobs go through a
//! [`KeyValueBackend`], so the same collections run against memory, a
//! directory of files, or the SQLite blob table.
//!
//! ```no_run
//! use momentum_core::Task;
//! use momentum_store::{LocalStore, MemoryBackend};
//! use std::sync::Arc;
//!
//! # async fn demo() -> momentum_core::Result<()> {
//! let store = LocalStore::new(Arc::new(MemoryBackend::new()));
//! store.add(Task::new("Plan week")).await?;
//! assert_eq!(store.collection::<Task>().await?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod collection;
pub mod local_store;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend, SharedBackend, SqliteBackend};
pub use collection::{corrupt_key, Collection, LoadOutcome};
pub use local_store::{DirtyKinds, LocalStore, StoreStats, SyncTrigger};
