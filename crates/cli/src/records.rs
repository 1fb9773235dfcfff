// FILE: crates/cli/src/records.rs

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::ArgMatches;
use momentum_core::{
    AccountType, AppError, BillingCycle, Budget, CalendarEvent, EntityKind, ExpenseCategory,
    FinancialAccount, FinancialTransaction, Goal, JournalEntry, Money, Priority, RecordId,
    SavingsGoal, Subscription, SyncRecord, Task, Timestamp, TransactionKind, Validator,
};
use momentum_store::LocalStore;
use serde_json::Value;

/// Field values collected from `add` flags
#[derive(Debug, Clone, Default)]
pub struct RecordInput {
    pub name: String,
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub transaction_kind: Option<TransactionKind>,
    pub cycle: Option<BillingCycle>,
    pub account_type: Option<AccountType>,
    pub color: Option<String>,
}

impl RecordInput {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let name = matches
            .get_one::<String>("name")
            .ok_or_else(|| anyhow!("A name or title is required"))?
            .clone();
        let text = |id: &str| matches.get_one::<String>(id).map(|s| s.as_str());

        Ok(Self {
            name,
            amount: text("amount").map(parse_money).transpose()?,
            date: text("date").map(parse_date).transpose()?,
            start: text("start").map(parse_datetime).transpose()?,
            end: text("end").map(parse_datetime).transpose()?,
            notes: text("notes").map(str::to_string),
            priority: text("priority")
                .map(|p| p.parse::<Priority>().map_err(|e| anyhow!(e)))
                .transpose()?,
            transaction_kind: text("type")
                .map(|t| t.parse::<TransactionKind>().map_err(|e| anyhow!(e)))
                .transpose()?,
            cycle: text("cycle").map(parse_cycle).transpose()?,
            account_type: text("account-type").map(parse_account_type).transpose()?,
            color: text("color").map(str::to_string),
        })
    }

    fn amount(&self, what: &str) -> Result<Money> {
        self.amount
            .ok_or_else(|| anyhow!("--amount is required for {}", what))
    }

    fn date_or_today(&self) -> NaiveDate {
        self.date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Builds a record of `kind` from `input`, validates it and stores it
pub async fn add_record(store: &LocalStore, kind: EntityKind, input: &RecordInput) -> Result<RecordId> {
    let name = input.name.clone();
    match kind {
        EntityKind::Task => {
            let mut task = Task::new(name);
            task.notes = input.notes.clone();
            task.priority = input.priority.unwrap_or_default();
            task.due_date = input.date;
            save(store, task).await
        }
        EntityKind::Goal => {
            let mut goal = Goal::new(name);
            goal.description = input.notes.clone();
            goal.target_date = input.date;
            save(store, goal).await
        }
        EntityKind::CalendarEvent => {
            let start = input
                .start
                .ok_or_else(|| anyhow!("--start is required for an event"))?;
            let end = input
                .end
                .unwrap_or_else(|| Timestamp::from_millis(start.as_millis() + 60 * 60 * 1000));
            let mut event = CalendarEvent::new(name, start, end);
            event.location = input.notes.clone();
            save(store, event).await
        }
        EntityKind::JournalEntry => {
            let body = input.notes.clone().unwrap_or_default();
            save(store, JournalEntry::new(name, body, input.date_or_today())).await
        }
        EntityKind::FinancialAccount => {
            let account = FinancialAccount::new(
                name,
                input.account_type.unwrap_or_default(),
                input.amount.unwrap_or(Money::ZERO),
            );
            save(store, account).await
        }
        EntityKind::FinancialTransaction => {
            let mut transaction = FinancialTransaction::new(
                name,
                input.amount("a transaction")?,
                input.transaction_kind.unwrap_or(TransactionKind::Expense),
                input.date_or_today(),
            );
            transaction.note = input.notes.clone();
            save(store, transaction).await
        }
        EntityKind::Subscription => {
            let subscription = Subscription::new(
                name,
                input.amount("a subscription")?,
                input.cycle.unwrap_or_default(),
                input.date_or_today(),
            );
            save(store, subscription).await
        }
        EntityKind::Budget => {
            let budget = Budget::new(name, input.amount("a budget")?, input.date_or_today());
            save(store, budget).await
        }
        EntityKind::SavingsGoal => {
            let mut goal = SavingsGoal::new(name, input.amount("a savings goal")?);
            goal.deadline = input.date;
            save(store, goal).await
        }
        EntityKind::ExpenseCategory => {
            let color = input.color.clone().unwrap_or_else(|| "#8E8E93".to_string());
            save(store, ExpenseCategory::new(name, color)).await
        }
    }
}

async fn save<T: SyncRecord + Validator>(store: &LocalStore, record: T) -> Result<RecordId> {
    if let Err(errors) = record.validate() {
        return Err(AppError::ValidationFailed {
            entity: T::KIND.to_string(),
            errors,
        }
        .into());
    }
    let id = record.id();
    store
        .add(record)
        .await
        .with_context(|| format!("Failed to save {}", T::KIND))?;
    Ok(id)
}

/// JSON form of every record of `T`, in collection order
pub async fn list_json<T: SyncRecord>(store: &LocalStore) -> Result<(Vec<Value>, bool)> {
    let collection = store
        .collection::<T>()
        .await
        .with_context(|| format!("Failed to load {} records", T::KIND))?;
    let values = collection
        .all()
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((values, collection.outcome().is_corrupt()))
}

/// JSON form of one record
pub async fn find_json<T: SyncRecord>(store: &LocalStore, id: RecordId) -> Result<Option<Value>> {
    match store.find::<T>(id).await? {
        Some(record) => Ok(Some(serde_json::to_value(&record)?)),
        None => Ok(None),
    }
}

/// Length of the ID prefix `list` prints
pub const SHORT_ID_LEN: usize = 8;

/// Short form of an ID, accepted back by [`resolve_id`]
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Resolves a full record ID or a unique prefix of one
pub async fn resolve_id<T: SyncRecord>(store: &LocalStore, text: &str) -> Result<RecordId> {
    if let Ok(id) = RecordId::from_string(text) {
        return Ok(id);
    }

    let prefix = text.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        bail!("Record ID is required");
    }
    let collection = store
        .collection::<T>()
        .await
        .with_context(|| format!("Failed to load {} records", T::KIND))?;
    let matches: Vec<RecordId> = collection
        .all()
        .iter()
        .map(|r| r.id())
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No {} matches ID '{}'", T::KIND, text),
        many => bail!(
            "ID '{}' matches {} {} records; use more characters",
            text,
            many.len(),
            T::KIND
        ),
    }
}

/// One-line description of a record payload
pub fn summarize(value: &Value) -> String {
    let label = ["title", "name"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .unwrap_or("(untitled)");

    let mut parts = vec![label.to_string()];
    for field in ["amount", "balance", "limit", "target"] {
        if let Some(cents) = value.get(field).and_then(Value::as_i64) {
            parts.push(format!("{} {}", field, Money::from_cents(cents)));
        }
    }
    for field in ["due_date", "date", "entry_date", "next_due_date"] {
        if let Some(date) = value.get(field).and_then(Value::as_str) {
            parts.push(date.to_string());
        }
    }
    if value.get("is_completed").and_then(Value::as_bool) == Some(true) {
        parts.push("done".to_string());
    }
    parts.join(" | ")
}

/// Parses amounts such as `12`, `12.5` or `-3.07` into minor units
pub fn parse_money(text: &str) -> Result<Money> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let valid = !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.len() <= 2
        && fraction.chars().all(|c| c.is_ascii_digit());
    if !valid {
        bail!("Invalid amount '{}': expected a number with at most two decimals", text);
    }

    let whole: i64 = whole
        .parse()
        .with_context(|| format!("Amount '{}' is too large", text))?;
    let fraction: i64 = format!("{:0<2}", fraction).parse().unwrap_or(0);
    let cents = whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(|| anyhow!("Amount '{}' is too large", text))?;

    Ok(Money::from_cents(if negative { -cents } else { cents }))
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", text))
}

/// Parses `YYYY-MM-DD HH:MM` (or with a `T` separator) as UTC
pub fn parse_datetime(text: &str) -> Result<Timestamp> {
    let text = text.trim();
    let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .with_context(|| format!("Invalid time '{}': expected YYYY-MM-DD HH:MM", text))?;
    Ok(Timestamp::from_millis(parsed.and_utc().timestamp_millis()))
}

fn parse_cycle(text: &str) -> Result<BillingCycle> {
    match text.trim().to_ascii_lowercase().as_str() {
        "weekly" => Ok(BillingCycle::Weekly),
        "monthly" => Ok(BillingCycle::Monthly),
        "quarterly" => Ok(BillingCycle::Quarterly),
        "yearly" => Ok(BillingCycle::Yearly),
        other => bail!("Unknown billing cycle '{}'", other),
    }
}

fn parse_account_type(text: &str) -> Result<AccountType> {
    match text.trim().to_ascii_lowercase().as_str() {
        "checking" => Ok(AccountType::Checking),
        "savings" => Ok(AccountType::Savings),
        "credit-card" | "credit" => Ok(AccountType::CreditCard),
        "cash" => Ok(AccountType::Cash),
        "investment" => Ok(AccountType::Investment),
        other => bail!("Unknown account type '{}'", other),
    }
}
