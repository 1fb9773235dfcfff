// crates/sync-engine/src/ledger.rs
//! Last agreed version of every synced record

use crate::error::SyncResult;
use momentum_core::{EntityKind, RecordId};
use momentum_store::KeyValueBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend key holding the ledger
pub const LEDGER_KEY: &str = "momentum.sync.ledger";

/// Content hash each record had when local and remote last agreed
///
/// A record with no entry has never been synced from this device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLedger {
    /// record type -> record id -> content hash
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl SyncLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the ledger; unreadable data starts a fresh ledger
    pub async fn load(backend: &dyn KeyValueBackend) -> SyncResult<Self> {
        match backend.get(LEDGER_KEY).await? {
            None => Ok(Self::new()),
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(ledger) => Ok(ledger),
                Err(e) => {
                    log::warn!("Sync ledger unreadable, starting fresh: {}", e);
                    Ok(Self::new())
                }
            },
        }
    }

    pub async fn save(&self, backend: &dyn KeyValueBackend) -> SyncResult<()> {
        let bytes = serde_json::to_vec(self)?;
        backend.put(LEDGER_KEY, &bytes).await?;
        Ok(())
    }

    /// Agreed hash for a record
    pub fn base(&self, kind: EntityKind, id: RecordId) -> Option<&str> {
        self.entries
            .get(kind.record_type())
            .and_then(|records| records.get(&id.as_string()))
            .map(String::as_str)
    }

    pub fn record(&mut self, kind: EntityKind, id: RecordId, hash: impl Into<String>) {
        self.entries
            .entry(kind.record_type().to_string())
            .or_default()
            .insert(id.as_string(), hash.into());
    }

    pub fn forget(&mut self, kind: EntityKind, id: RecordId) {
        if let Some(records) = self.entries.get_mut(kind.record_type()) {
            records.remove(&id.as_string());
        }
    }

    /// Identifiers with an agreed version for `kind`
    pub fn ids(&self, kind: EntityKind) -> Vec<RecordId> {
        self.entries
            .get(kind.record_type())
            .map(|records| {
                records
                    .keys()
                    .filter_map(|id| RecordId::from_string(id).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Forgets everything, so the next pass treats both sides as new
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
