//! Domain types for Momentum
//!
//! This module contains all domain models organized by responsibility:
//! - `record`: Record identity, entity kinds and the `SyncRecord` contract
//! - `planner`: Tasks, goals, calendar events and journal entries
//! - `finance`: Accounts, transactions, subscriptions, budgets, savings goals and categories
//! - `common`: Shared value types and the `Validator` trait

/// Implements `SyncRecord` for a struct with `id` and `modified_at` fields
macro_rules! impl_sync_record {
    ($ty:ident, $kind:ident) => {
        impl crate::types::SyncRecord for $ty {
            const KIND: crate::types::EntityKind = crate::types::EntityKind::$kind;

            fn id(&self) -> crate::types::RecordId {
                self.id
            }

            fn modified_at(&self) -> crate::types::Timestamp {
                self.modified_at
            }

            fn touch(&mut self) {
                self.modified_at = crate::types::Timestamp::now();
            }
        }
    };
}

mod common;
mod finance;
mod planner;
mod record;

// Re-export all public types
pub use common::{Money, Timestamp, Validator};
pub use finance::{
    AccountType, BillingCycle, Budget, ExpenseCategory, FinancialAccount, FinancialTransaction,
    SavingsGoal, Subscription, TransactionKind,
};
pub use planner::{CalendarEvent, Goal, JournalEntry, Priority, Task};
pub use record::{payload_hash, EntityKind, RecordId, SyncRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_types_are_exported() {
        let _id: RecordId = RecordId::new();
        let _task: Task = Task::new("exported");
        let _money: Money = Money::ZERO;
    }

    #[test]
    fn test_record_kinds_match_types() {
        assert_eq!(Task::KIND, EntityKind::Task);
        assert_eq!(Goal::KIND, EntityKind::Goal);
        assert_eq!(CalendarEvent::KIND, EntityKind::CalendarEvent);
        assert_eq!(JournalEntry::KIND, EntityKind::JournalEntry);
        assert_eq!(FinancialAccount::KIND, EntityKind::FinancialAccount);
        assert_eq!(FinancialTransaction::KIND, EntityKind::FinancialTransaction);
        assert_eq!(Subscription::KIND, EntityKind::Subscription);
        assert_eq!(Budget::KIND, EntityKind::Budget);
        assert_eq!(SavingsGoal::KIND, EntityKind::SavingsGoal);
        assert_eq!(ExpenseCategory::KIND, EntityKind::ExpenseCategory);
    }

    #[test]
    fn test_records_serialize_with_id_field() {
        let task = Task::new("json");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["id"], serde_json::json!(task.id.as_string()));
    }
}
