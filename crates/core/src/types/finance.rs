//! Personal-finance app models

use crate::types::{Money, RecordId, Timestamp, Validator};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of financial account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    CreditCard,
    Cash,
    Investment,
}

/// A bank, card or cash account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialAccount {
    pub id: RecordId,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Money,
    /// ISO 4217 currency code
    pub currency: String,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl FinancialAccount {
    pub fn new(name: impl Into<String>, account_type: AccountType, balance: Money) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            account_type,
            balance,
            currency: "USD".to_string(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Applies a transaction to the running balance
    pub fn apply(&mut self, transaction: &FinancialTransaction) {
        self.balance = self.balance.saturating_add(transaction.signed_amount());
        self.modified_at = Timestamp::now();
    }
}

impl Validator for FinancialAccount {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Account name cannot be empty".to_string());
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            errors.push(format!("Invalid currency code '{}'", self.currency));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction kind '{}'", other)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// A single income or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialTransaction {
    pub id: RecordId,
    pub account_id: Option<RecordId>,
    pub category_id: Option<RecordId>,
    pub title: String,
    /// Always non-negative; direction comes from `kind`
    pub amount: Money,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl FinancialTransaction {
    pub fn new(
        title: impl Into<String>,
        amount: Money,
        kind: TransactionKind,
        date: NaiveDate,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            account_id: None,
            category_id: None,
            title: title.into(),
            amount,
            kind,
            date,
            note: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Amount with sign applied (expenses negative)
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => Money::from_cents(-self.amount.cents()),
        }
    }
}

impl Validator for FinancialTransaction {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Transaction title cannot be empty".to_string());
        }
        if self.amount.is_negative() {
            errors.push("Transaction amount cannot be negative".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// How often a subscription bills
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

/// A recurring charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: RecordId,
    pub name: String,
    pub amount: Money,
    pub billing_cycle: BillingCycle,
    pub next_due_date: NaiveDate,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Subscription {
    pub fn new(
        name: impl Into<String>,
        amount: Money,
        billing_cycle: BillingCycle,
        next_due_date: NaiveDate,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            amount,
            billing_cycle,
            next_due_date,
            is_active: true,
            created_at: now,
            modified_at: now,
        }
    }

    /// Moves the due date forward one billing cycle
    pub fn advance(&mut self) {
        let next = match self.billing_cycle {
            BillingCycle::Weekly => self.next_due_date.checked_add_days(chrono::Days::new(7)),
            BillingCycle::Monthly => self.next_due_date.checked_add_months(Months::new(1)),
            BillingCycle::Quarterly => self.next_due_date.checked_add_months(Months::new(3)),
            BillingCycle::Yearly => self.next_due_date.checked_add_months(Months::new(12)),
        };
        if let Some(next) = next {
            self.next_due_date = next;
            self.modified_at = Timestamp::now();
        }
    }
}

impl Validator for Subscription {
    fn validate(&self) -> Result<(), Vec<String>> {
        if self.name.trim().is_empty() {
            Err(vec!["Subscription name cannot be empty".to_string()])
        } else {
            Ok(())
        }
    }
}

/// Spending limit for a category over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: RecordId,
    pub name: String,
    pub category_id: Option<RecordId>,
    pub limit: Money,
    pub spent: Money,
    pub period_start: NaiveDate,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Budget {
    pub fn new(name: impl Into<String>, limit: Money, period_start: NaiveDate) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            category_id: None,
            limit,
            spent: Money::ZERO,
            period_start,
            created_at: now,
            modified_at: now,
        }
    }

    /// Amount left before the limit is reached (negative when over)
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.limit.cents() - self.spent.cents())
    }
}

impl Validator for Budget {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Budget name cannot be empty".to_string());
        }
        if self.limit.cents() <= 0 {
            errors.push("Budget limit must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Money being put aside for a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: RecordId,
    pub name: String,
    pub target: Money,
    pub saved: Money,
    pub deadline: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl SavingsGoal {
    pub fn new(name: impl Into<String>, target: Money) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            target,
            saved: Money::ZERO,
            deadline: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Completion in percent, capped at 100
    pub fn percent_complete(&self) -> u8 {
        if self.target.cents() <= 0 {
            return 100;
        }
        let pct = self.saved.cents().max(0) * 100 / self.target.cents();
        pct.min(100) as u8
    }
}

impl Validator for SavingsGoal {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Savings goal name cannot be empty".to_string());
        }
        if self.target.cents() <= 0 {
            errors.push("Savings target must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// User-defined spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: RecordId,
    pub name: String,
    /// Hex colour such as `#FF9500`
    pub color: String,
    pub icon: Option<String>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl ExpenseCategory {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            color: color.into(),
            icon: None,
            created_at: now,
            modified_at: now,
        }
    }
}

impl Validator for ExpenseCategory {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Category name cannot be empty".to_string());
        }
        let hex = self.color.strip_prefix('#').unwrap_or("");
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            errors.push(format!("Invalid colour '{}'", self.color));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl_sync_record!(FinancialAccount, FinancialAccount);
impl_sync_record!(FinancialTransaction, FinancialTransaction);
impl_sync_record!(Subscription, Subscription);
impl_sync_record!(Budget, Budget);
impl_sync_record!(SavingsGoal, SavingsGoal);
impl_sync_record!(ExpenseCategory, ExpenseCategory);
