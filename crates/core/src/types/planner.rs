//! Planner app models: tasks, goals, calendar events and journal entries

use crate::types::{RecordId, Timestamp, Validator};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub notes: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Task {
    /// Creates a new open task
    pub fn new(title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            title: title.into(),
            notes: None,
            priority: Priority::default(),
            due_date: None,
            is_completed: false,
            completed_at: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Marks the task complete
    pub fn complete(&mut self) {
        let now = Timestamp::now();
        self.is_completed = true;
        self.completed_at = Some(now);
        self.modified_at = now;
    }

    /// Reopens a completed task
    pub fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
        self.modified_at = Timestamp::now();
    }

    /// Returns true if the task is open and its due date has passed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < today)
    }
}

impl Validator for Task {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Task title cannot be empty".to_string());
        }
        if self.is_completed != self.completed_at.is_some() {
            errors.push("Completion flag and completion time disagree".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A longer-term objective tracked by percentage progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    /// Progress in percent (0-100)
    pub progress: u8,
    pub is_achieved: bool,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Goal {
    /// Creates a new goal with no progress
    pub fn new(title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            title: title.into(),
            description: None,
            target_date: None,
            progress: 0,
            is_achieved: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// Sets progress, clamping to 100; reaching 100 marks the goal achieved
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        self.is_achieved = self.progress == 100;
        self.modified_at = Timestamp::now();
    }
}

impl Validator for Goal {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Goal title cannot be empty".to_string());
        }
        if self.progress > 100 {
            errors.push(format!("Goal progress must be 0-100, got {}", self.progress));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A scheduled calendar entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: RecordId,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub is_all_day: bool,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl CalendarEvent {
    /// Creates a new event spanning the given range
    pub fn new(title: impl Into<String>, starts_at: Timestamp, ends_at: Timestamp) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            title: title.into(),
            location: None,
            starts_at,
            ends_at,
            is_all_day: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// Returns the event length in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.ends_at.as_millis() - self.starts_at.as_millis()
    }
}

impl Validator for CalendarEvent {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Event title cannot be empty".to_string());
        }
        if self.ends_at < self.starts_at {
            errors.push("Event cannot end before it starts".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A dated journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    pub mood: Option<String>,
    pub entry_date: NaiveDate,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl JournalEntry {
    /// Creates a new entry for the given day
    pub fn new(title: impl Into<String>, body: impl Into<String>, entry_date: NaiveDate) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            title: title.into(),
            body: body.into(),
            mood: None,
            entry_date,
            created_at: now,
            modified_at: now,
        }
    }

    /// Number of whitespace-separated words in the body
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

impl Validator for JournalEntry {
    fn validate(&self) -> Result<(), Vec<String>> {
        if self.title.trim().is_empty() {
            Err(vec!["Journal entry title cannot be empty".to_string()])
        } else {
            Ok(())
        }
    }
}

impl_sync_record!(Task, Task);
impl_sync_record!(Goal, Goal);
impl_sync_record!(CalendarEvent, CalendarEvent);
impl_sync_record!(JournalEntry, JournalEntry);
