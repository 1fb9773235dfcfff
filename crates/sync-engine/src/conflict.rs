// crates/sync-engine/src/conflict.rs
//! Conflict detection and the pending-conflict queue

use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteRecord;
use momentum_core::{EntityKind, RecordId, SyncRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// How the two sides diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictType {
    /// Both sides created the record independently
    Created,
    /// Both sides edited the record
    Modified,
    /// One side deleted the record the other edited
    Deleted,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// One side's representation of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordVersion {
    Present {
        payload: serde_json::Value,
        hash: String,
        modified_at: Timestamp,
    },
    Tombstone,
}

impl RecordVersion {
    pub fn from_local<T: SyncRecord>(record: Option<&T>) -> SyncResult<Self> {
        match record {
            None => Ok(Self::Tombstone),
            Some(record) => Ok(Self::Present {
                payload: serde_json::to_value(record)?,
                hash: record.content_hash()?,
                modified_at: record.modified_at(),
            }),
        }
    }

    pub fn from_remote(record: Option<&RemoteRecord>) -> Self {
        match record {
            None => Self::Tombstone,
            Some(record) => Self::Present {
                payload: record.payload.clone(),
                hash: record.content_hash(),
                modified_at: record.modified_at,
            },
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }

    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Present { hash, .. } => Some(hash),
            Self::Tombstone => None,
        }
    }

    pub fn modified_at(&self) -> Option<Timestamp> {
        match self {
            Self::Present { modified_at, .. } => Some(*modified_at),
            Self::Tombstone => None,
        }
    }
}

/// A record changed on both sides since they last agreed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    pub kind: EntityKind,
    pub record_id: RecordId,
    pub conflict_type: ConflictType,
    pub local: RecordVersion,
    pub server: RecordVersion,
    pub detected_at: Timestamp,
}

impl Conflict {
    pub fn new(
        kind: EntityKind,
        record_id: RecordId,
        conflict_type: ConflictType,
        local: RecordVersion,
        server: RecordVersion,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            record_id,
            conflict_type,
            local,
            server,
            detected_at: Timestamp::now(),
        }
    }

    /// The version the caller chose
    pub fn chosen(&self, choice: ConflictChoice) -> &RecordVersion {
        match choice {
            ConflictChoice::KeepLocal => &self.local,
            ConflictChoice::KeepServer => &self.server,
        }
    }
}

/// Which side wins a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictChoice {
    KeepLocal,
    KeepServer,
}

/// What a sync pass does with one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Both sides hold the same content
    InSync,
    /// Neither side has the record any more
    Gone,
    /// Send the local version to the server
    PushLocal,
    /// Take the server version locally
    PullServer,
    /// The server deleted an unchanged local record
    DeleteLocal,
    /// The local side deleted an unchanged server record
    DeleteServer,
    Conflict(ConflictType),
}

/// Compares content hashes against the last agreed hash
pub fn decide(base: Option<&str>, local: Option<&str>, server: Option<&str>) -> Decision {
    match (local, server) {
        (None, None) => Decision::Gone,
        (Some(l), Some(s)) if l == s => Decision::InSync,
        (Some(l), Some(s)) => match base {
            None => Decision::Conflict(ConflictType::Created),
            Some(b) if b == l => Decision::PullServer,
            Some(b) if b == s => Decision::PushLocal,
            Some(_) => Decision::Conflict(ConflictType::Modified),
        },
        (Some(l), None) => match base {
            None => Decision::PushLocal,
            Some(b) if b == l => Decision::DeleteLocal,
            Some(_) => Decision::Conflict(ConflictType::Deleted),
        },
        (None, Some(s)) => match base {
            None => Decision::PullServer,
            Some(b) if b == s => Decision::DeleteServer,
            Some(_) => Decision::Conflict(ConflictType::Deleted),
        },
    }
}

/// Pending conflicts in detection order
///
/// Holds at most one entry per record; detecting the same record again
/// replaces its entry in place and keeps the entry's identifier.
#[derive(Debug, Clone, Default)]
pub struct ConflictQueue {
    conflicts: Arc<Mutex<Vec<Conflict>>>,
}

impl ConflictQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue holding `conflicts`, de-duplicated
    pub fn from_conflicts(conflicts: Vec<Conflict>) -> Self {
        let queue = Self::new();
        for conflict in conflicts {
            // A fresh queue is never poisoned
            let _ = queue.enqueue(conflict);
        }
        queue
    }

    /// Adds a conflict, replacing any entry for the same record
    ///
    /// Returns the identifier the entry is queued under.
    pub fn enqueue(&self, mut conflict: Conflict) -> SyncResult<String> {
        let mut conflicts = self.lock()?;
        match conflicts
            .iter_mut()
            .find(|c| c.kind == conflict.kind && c.record_id == conflict.record_id)
        {
            Some(existing) => {
                conflict.id = existing.id.clone();
                *existing = conflict;
                Ok(existing.id.clone())
            }
            None => {
                let id = conflict.id.clone();
                conflicts.push(conflict);
                Ok(id)
            }
        }
    }

    pub fn list(&self) -> SyncResult<Vec<Conflict>> {
        Ok(self.lock()?.clone())
    }

    pub fn get(&self, conflict_id: &str) -> SyncResult<Conflict> {
        self.lock()?
            .iter()
            .find(|c| c.id == conflict_id)
            .cloned()
            .ok_or_else(|| SyncError::ConflictNotFound(conflict_id.to_string()))
    }

    /// Entry for a record, if one is queued
    pub fn find_record(&self, kind: EntityKind, record_id: RecordId) -> Option<Conflict> {
        self.conflicts.lock().ok().and_then(|conflicts| {
            conflicts
                .iter()
                .find(|c| c.kind == kind && c.record_id == record_id)
                .cloned()
        })
    }

    pub fn remove(&self, conflict_id: &str) -> SyncResult<Conflict> {
        let mut conflicts = self.lock()?;
        let index = conflicts
            .iter()
            .position(|c| c.id == conflict_id)
            .ok_or_else(|| SyncError::ConflictNotFound(conflict_id.to_string()))?;
        Ok(conflicts.remove(index))
    }

    pub fn len(&self) -> usize {
        self.conflicts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> SyncResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> SyncResult<std::sync::MutexGuard<'_, Vec<Conflict>>> {
        self.conflicts
            .lock()
            .map_err(|_| SyncError::Custom("Lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momentum_core::Task;

    fn present(hash: &str) -> RecordVersion {
        RecordVersion::Present {
            payload: serde_json::json!({}),
            hash: hash.to_string(),
            modified_at: Timestamp::from_millis(1),
        }
    }

    fn conflict(id: RecordId, hash: &str) -> Conflict {
        Conflict::new(
            EntityKind::Task,
            id,
            ConflictType::Modified,
            present(hash),
            present("server"),
        )
    }

    #[test]
    fn test_decide_without_base() {
        assert_eq!(decide(None, Some("a"), None), Decision::PushLocal);
        assert_eq!(decide(None, None, Some("a")), Decision::PullServer);
        assert_eq!(decide(None, Some("a"), Some("a")), Decision::InSync);
        assert_eq!(
            decide(None, Some("a"), Some("b")),
            Decision::Conflict(ConflictType::Created)
        );
        assert_eq!(decide(None, None, None), Decision::Gone);
    }

    #[test]
    fn test_decide_with_base() {
        assert_eq!(decide(Some("a"), Some("a"), Some("b")), Decision::PullServer);
        assert_eq!(decide(Some("a"), Some("b"), Some("a")), Decision::PushLocal);
        assert_eq!(
            decide(Some("a"), Some("b"), Some("c")),
            Decision::Conflict(ConflictType::Modified)
        );
        assert_eq!(decide(Some("a"), Some("b"), Some("b")), Decision::InSync);
        assert_eq!(decide(Some("a"), None, None), Decision::Gone);
    }

    #[test]
    fn test_decide_deletions() {
        assert_eq!(decide(Some("a"), Some("a"), None), Decision::DeleteLocal);
        assert_eq!(decide(Some("a"), None, Some("a")), Decision::DeleteServer);
        assert_eq!(
            decide(Some("a"), Some("b"), None),
            Decision::Conflict(ConflictType::Deleted)
        );
        assert_eq!(
            decide(Some("a"), None, Some("b")),
            Decision::Conflict(ConflictType::Deleted)
        );
    }

    #[test]
    fn test_queue_deduplicates_by_record() {
        let queue = ConflictQueue::new();
        let a = RecordId::new();
        let b = RecordId::new();

        let first = queue.enqueue(conflict(a, "first")).unwrap();
        queue.enqueue(conflict(b, "other")).unwrap();
        let again = queue.enqueue(conflict(a, "second")).unwrap();
        assert_eq!(first, again);

        let list = queue.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].record_id, a);
        assert_eq!(list[0].id, first);
        assert_eq!(list[0].local.hash(), Some("second"));
        assert_eq!(list[1].record_id, b);
    }

    #[test]
    fn test_queue_remove() {
        let queue = ConflictQueue::new();
        let c = conflict(RecordId::new(), "x");
        queue.enqueue(c.clone()).unwrap();

        assert_eq!(queue.get(&c.id).unwrap(), c);
        assert!(queue.find_record(EntityKind::Task, c.record_id).is_some());
        queue.remove(&c.id).unwrap();
        assert!(queue.is_empty());
        assert!(matches!(
            queue.remove(&c.id),
            Err(SyncError::ConflictNotFound(_))
        ));
    }

    #[test]
    fn test_versions_from_sides() {
        let task = Task::new("Both");
        let local = RecordVersion::from_local(Some(&task)).unwrap();
        let remote = RemoteRecord::from_record(&task).unwrap();
        let server = RecordVersion::from_remote(Some(&remote));

        assert_eq!(local.hash(), server.hash());
        assert!(RecordVersion::from_local::<Task>(None).unwrap().is_tombstone());
        assert_eq!(server.modified_at(), Some(task.modified_at));
    }
}
