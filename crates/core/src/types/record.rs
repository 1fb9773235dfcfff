//! Record identity and the contract every synchronized entity fulfils

use crate::types::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a record within its collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random RecordId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a RecordId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }

    /// Returns the RecordId as a string
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every entity type that is stored locally and mirrored to the cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Task,
    Goal,
    CalendarEvent,
    JournalEntry,
    FinancialAccount,
    FinancialTransaction,
    Subscription,
    Budget,
    SavingsGoal,
    ExpenseCategory,
}

impl EntityKind {
    /// Planner app entities, in sync phase order
    pub const PLANNER: [EntityKind; 4] = [
        EntityKind::Task,
        EntityKind::Goal,
        EntityKind::CalendarEvent,
        EntityKind::JournalEntry,
    ];

    /// Finance app entities, in sync phase order
    pub const FINANCE: [EntityKind; 6] = [
        EntityKind::FinancialAccount,
        EntityKind::ExpenseCategory,
        EntityKind::FinancialTransaction,
        EntityKind::Subscription,
        EntityKind::Budget,
        EntityKind::SavingsGoal,
    ];

    /// All kinds, planner first
    pub fn all() -> Vec<EntityKind> {
        Self::PLANNER.iter().chain(Self::FINANCE.iter()).copied().collect()
    }

    /// Record type name used by the remote record store
    pub fn record_type(&self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Goal => "Goal",
            Self::CalendarEvent => "CalendarEvent",
            Self::JournalEntry => "JournalEntry",
            Self::FinancialAccount => "FinancialAccount",
            Self::FinancialTransaction => "FinancialTransaction",
            Self::Subscription => "Subscription",
            Self::Budget => "Budget",
            Self::SavingsGoal => "SavingsGoal",
            Self::ExpenseCategory => "ExpenseCategory",
        }
    }

    /// Fixed key under which the local collection blob is stored
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Task => "momentum.tasks",
            Self::Goal => "momentum.goals",
            Self::CalendarEvent => "momentum.calendar_events",
            Self::JournalEntry => "momentum.journal_entries",
            Self::FinancialAccount => "momentum.financial_accounts",
            Self::FinancialTransaction => "momentum.financial_transactions",
            Self::Subscription => "momentum.subscriptions",
            Self::Budget => "momentum.budgets",
            Self::SavingsGoal => "momentum.savings_goals",
            Self::ExpenseCategory => "momentum.expense_categories",
        }
    }

    /// Short name used on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Goal => "goal",
            Self::CalendarEvent => "event",
            Self::JournalEntry => "journal",
            Self::FinancialAccount => "account",
            Self::FinancialTransaction => "transaction",
            Self::Subscription => "subscription",
            Self::Budget => "budget",
            Self::SavingsGoal => "savings-goal",
            Self::ExpenseCategory => "category",
        }
    }

    /// Returns true for planner app entities
    pub fn is_planner(&self) -> bool {
        Self::PLANNER.contains(self)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_type())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::all()
            .into_iter()
            .find(|kind| {
                kind.slug().eq_ignore_ascii_case(needle)
                    || kind.record_type().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("unknown entity kind '{}'", needle))
    }
}

/// Contract for entities held in a local collection and mirrored remotely
///
/// Records serialize to a JSON object; that object is both the local
/// persistence format and the remote record payload.
pub trait SyncRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity kind this record type belongs to
    const KIND: EntityKind;

    /// Stable identifier
    fn id(&self) -> RecordId;

    /// Last local modification time
    fn modified_at(&self) -> Timestamp;

    /// Bumps the modification time after an edit
    fn touch(&mut self);

    /// Hex-encoded SHA-256 of the canonical JSON encoding
    fn content_hash(&self) -> crate::Result<String> {
        Ok(payload_hash(&serde_json::to_value(self)?))
    }
}

/// Hashes a JSON payload
///
/// Object keys are emitted in sorted order by `serde_json::Value`, so two
/// payloads with equal content always hash identically.
pub fn payload_hash(payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
