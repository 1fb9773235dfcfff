//! Momentum core: record models and the shared error taxonomy
//!
//! Every entity the planner and finance apps persist locally and mirror to the
//! cloud lives here, together with the `SyncRecord` contract the store and the
//! sync engine are written against.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use types::{
    payload_hash, AccountType, BillingCycle, Budget, CalendarEvent, EntityKind, ExpenseCategory,
    FinancialAccount, FinancialTransaction, Goal, JournalEntry, Money, Priority, RecordId,
    SavingsGoal, Subscription, SyncRecord, Task, Timestamp, TransactionKind, Validator,
};

/// Runs `$body` with `$T` bound to the record type of a runtime [`EntityKind`]
///
/// ```
/// use momentum_core::{dispatch_kind, EntityKind, SyncRecord};
///
/// let kind = EntityKind::Budget;
/// let name = dispatch_kind!(kind, |R| R::KIND.record_type());
/// assert_eq!(name, "Budget");
/// ```
#[macro_export]
macro_rules! dispatch_kind {
    ($kind:expr, |$T:ident| $body:expr) => {
        match $kind {
            $crate::EntityKind::Task => {
                type $T = $crate::Task;
                $body
            }
            $crate::EntityKind::Goal => {
                type $T = $crate::Goal;
                $body
            }
            $crate::EntityKind::CalendarEvent => {
                type $T = $crate::CalendarEvent;
                $body
            }
            $crate::EntityKind::JournalEntry => {
                type $T = $crate::JournalEntry;
                $body
            }
            $crate::EntityKind::FinancialAccount => {
                type $T = $crate::FinancialAccount;
                $body
            }
            $crate::EntityKind::FinancialTransaction => {
                type $T = $crate::FinancialTransaction;
                $body
            }
            $crate::EntityKind::Subscription => {
                type $T = $crate::Subscription;
                $body
            }
            $crate::EntityKind::Budget => {
                type $T = $crate::Budget;
                $body
            }
            $crate::EntityKind::SavingsGoal => {
                type $T = $crate::SavingsGoal;
                $body
            }
            $crate::EntityKind::ExpenseCategory => {
                type $T = $crate::ExpenseCategory;
                $body
            }
        }
    };
}
