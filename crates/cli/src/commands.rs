// FILE: crates/cli/src/commands.rs

use crate::context::AppContext;
use crate::records::{self, RecordInput};
use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use console::style;
use momentum_config::ConfigManager;
use momentum_core::{dispatch_kind, AppError, EntityKind, RecordId, Task, Timestamp};
use momentum_sync::{
    AutoSync, ConflictChoice, RecordVersion, SyncOrchestrator, SyncOutcome, SyncReport, SyncScope,
    SyncStatus,
};
use std::sync::Arc;

/// Write the default config and create the data directories
pub async fn init(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write default configuration")?;
    let ctx = AppContext::load(manager).await?;
    std::fs::create_dir_all(&ctx.remote_dir).context("Failed to create remote directory")?;

    if created {
        println!("{} Configuration created", style("✓").green().bold());
    } else {
        println!("Configuration already present");
    }
    println!("  Config: {}", manager.config_path().display());
    println!("  Data:   {} ({})", ctx.data_dir.display(), ctx.config.app.storage);
    println!("  Remote: {}", ctx.remote_dir.display());

    Ok(())
}

/// Print the effective configuration
pub fn show_config(manager: &ConfigManager, ctx: &AppContext) {
    let config = &ctx.config;
    println!("\n{}", style("Configuration").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("File: {}", manager.config_path().display());
    println!("Storage: {} in {}", config.app.storage, ctx.data_dir.display());
    println!("Remote: {}", ctx.remote_dir.display());
    println!("Log level: {}", config.app.log_level);
    println!("Sync scope: {}", config.sync.scope);
    println!("Batch size: {}", config.sync.batch_size);
    println!(
        "Auto sync: {} (every {}s)",
        if config.sync.auto_sync { "on" } else { "off" },
        config.sync.interval_secs
    );
    println!(
        "Retry: {} attempts, {}ms to {}ms, x{}",
        config.sync.retry.max_attempts,
        config.sync.retry.initial_delay_ms,
        config.sync.retry.max_delay_ms,
        config.sync.retry.multiplier
    );
}

/// Add a record of any kind
pub async fn add_record(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let kind = kind_arg(matches)?;
    let input = RecordInput::from_matches(matches)?;

    let id = records::add_record(&ctx.store, kind, &input).await?;

    println!("{} {} added", style("✓").green().bold(), kind);
    println!("  ID: {}", id);
    println!("  {}", input.name);

    push_changes(ctx).await
}

/// List the records of one kind
pub async fn list_records(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let kind = kind_arg(matches)?;
    let (values, corrupt) = dispatch_kind!(kind, |R| records::list_json::<R>(&ctx.store).await)?;

    if corrupt {
        println!(
            "{} Stored {} data could not be read; it is kept aside and will not be overwritten silently.",
            style("!").yellow().bold(),
            kind
        );
    }

    if values.is_empty() {
        println!("No {} records. Use 'add {}' to create one.", kind, kind.slug());
        return Ok(());
    }

    println!("\n{} {} records", style(values.len()).bold().cyan(), kind);
    println!("{}", "=".repeat(80));
    for value in &values {
        let id = value.get("id").and_then(|v| v.as_str()).unwrap_or("?");
        println!(
            "{}  {}",
            style(records::short_id(id)).dim(),
            truncate(&records::summarize(value), 68)
        );
    }
    println!("\nUse the ID shown (or any unique prefix) with show, delete and complete.");

    Ok(())
}

/// Show one record in full
pub async fn show_record(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let kind = kind_arg(matches)?;
    let id = id_arg(ctx, kind, matches).await?;

    let value = dispatch_kind!(kind, |R| records::find_json::<R>(&ctx.store, id).await)?
        .ok_or_else(|| anyhow!("No {} with ID {}", kind, id))?;

    println!("\n{}", style(format!("{} {}", kind, id)).bold().cyan());
    println!("{}", "=".repeat(80));
    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}

/// Delete a record after confirmation
pub async fn delete_record(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let kind = kind_arg(matches)?;
    let id = id_arg(ctx, kind, matches).await?;
    let force = matches.get_flag("force");

    let value = dispatch_kind!(kind, |R| records::find_json::<R>(&ctx.store, id).await)?
        .ok_or_else(|| anyhow!("No {} with ID {}", kind, id))?;
    let label = records::summarize(&value);

    if !force {
        println!("Are you sure you want to delete '{}'? (y/N)", label);
        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    ctx.store
        .delete_kind(kind, id)
        .await
        .with_context(|| format!("Failed to delete {}", kind))?;

    println!("{} {} deleted: {}", style("✓").green().bold(), kind, label);

    push_changes(ctx).await
}

/// Mark a task complete
pub async fn complete_task(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let id = id_arg(ctx, EntityKind::Task, matches).await?;

    let mut task = ctx
        .store
        .find::<Task>(id)
        .await
        .context("Failed to load tasks")?
        .ok_or_else(|| anyhow!("No task with ID {}", id))?;

    if task.is_completed {
        println!("'{}' is already complete", task.title);
        return Ok(());
    }

    task.complete();
    let title = task.title.clone();
    ctx.store
        .update(task)
        .await
        .context("Failed to update task")?;

    println!("{} Completed: {}", style("✓").green().bold(), title);

    push_changes(ctx).await
}

/// Run a sync pass, or keep syncing on a timer with `--watch`
pub async fn sync(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let scope = matches
        .get_one::<String>("scope")
        .map(|s| s.parse::<SyncScope>().map_err(|e| anyhow!(e)))
        .transpose()?;
    let orchestrator = ctx.orchestrator(scope).await?;

    if matches.get_flag("watch") {
        return watch(ctx, orchestrator).await;
    }

    let report = orchestrator.perform_full_sync().await;
    print_report(&report);
    print_retry_hint(&orchestrator);

    match report.outcome {
        SyncOutcome::Failed(_) => bail!("Sync failed"),
        _ => Ok(()),
    }
}

async fn watch(ctx: &AppContext, orchestrator: Arc<SyncOrchestrator>) -> Result<()> {
    let interval = ctx.config.sync.interval();
    let auto = AutoSync::start(Arc::clone(&orchestrator), interval);
    let mut updates = orchestrator.subscribe();

    println!(
        "Syncing every {}s. Press Ctrl+C to stop.",
        auto.interval().as_secs()
    );
    print_report(&orchestrator.perform_full_sync().await);

    let mut last_status = orchestrator.snapshot().status;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = updates.borrow_and_update().status;
                if status != last_status && status != SyncStatus::Syncing {
                    println!("{} {}", style(clock()).dim(), describe_status(&status));
                }
                last_status = status;
            }
        }
    }

    auto.stop();
    orchestrator.cancel_pending_retry();
    println!("Stopped.");
    Ok(())
}

/// Show the last sync state and pending work
pub async fn status(ctx: &AppContext) -> Result<()> {
    let orchestrator = ctx.orchestrator(None).await?;
    let snapshot = orchestrator.snapshot();

    println!("\n{}", style("Sync Status").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Status: {}", describe_status(&snapshot.status));
    println!("Last sync: {}", format_time(snapshot.last_sync));
    println!("Scope: {}", orchestrator.options().scope);
    println!("Pending conflicts: {}", style(snapshot.conflicts.len()).bold());
    if orchestrator.reduced_scope_pending() {
        println!(
            "{} Storage is full; the next sync covers planner data only.",
            style("!").yellow().bold()
        );
    }

    Ok(())
}

/// List pending conflicts
pub async fn list_conflicts(ctx: &AppContext) -> Result<()> {
    let orchestrator = ctx.orchestrator(None).await?;
    let conflicts = orchestrator
        .conflicts()
        .context("Failed to read conflicts")?;

    if conflicts.is_empty() {
        println!("No conflicts. Everything is in sync.");
        return Ok(());
    }

    println!("\n{} Conflicts", style(conflicts.len()).bold().yellow());
    println!("{}", "=".repeat(80));
    for conflict in conflicts {
        println!(
            "\n{} {} ({})",
            style(&conflict.id).bold(),
            conflict.kind,
            conflict.conflict_type
        );
        println!("  Record: {}", conflict.record_id);
        println!("  This device: {}", describe_version(&conflict.local));
        println!("  Cloud:       {}", describe_version(&conflict.server));
    }
    println!("\nResolve with: momentum resolve <CONFLICT_ID> --keep local|server");

    Ok(())
}

/// Resolve one conflict by keeping one side
pub async fn resolve(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let conflict_id = matches
        .get_one::<String>("id")
        .ok_or_else(|| anyhow!("Conflict ID is required"))?;
    let choice = match matches.get_one::<String>("keep").map(|s| s.as_str()) {
        Some("local") => ConflictChoice::KeepLocal,
        Some("server") => ConflictChoice::KeepServer,
        other => bail!("Unknown choice {:?}: use local or server", other),
    };

    let orchestrator = ctx.orchestrator(None).await?;
    orchestrator
        .resolve_conflict(conflict_id, choice)
        .await
        .with_context(|| format!("Failed to resolve conflict {}", conflict_id))?;

    let remaining = orchestrator.conflicts()?.len();
    println!("{} Conflict resolved", style("✓").green().bold());
    if remaining > 0 {
        println!("  {} conflicts remaining", remaining);
    }

    Ok(())
}

/// Show per-kind record counts
pub async fn show_stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.store.stats().await.context("Failed to read store")?;

    println!("\n{}", style("Store Statistics").bold().cyan());
    println!("{}", "=".repeat(80));
    for kind in EntityKind::all() {
        if stats.corrupt.contains(&kind) {
            println!("{:<22} {}", kind.to_string(), style("unreadable").red());
        } else {
            let count = stats.counts.get(&kind).copied().unwrap_or(0);
            println!("{:<22} {}", kind.to_string(), count);
        }
    }
    println!("Total records: {}", style(stats.total_records()).bold());
    if !stats.preserved.is_empty() {
        println!("Preserved unreadable data: {}", stats.preserved.join(", "));
    }

    Ok(())
}

/// Register change subscriptions for the configured scope
pub async fn subscribe(ctx: &AppContext) -> Result<()> {
    let orchestrator = ctx.orchestrator(None).await?;
    let ids = orchestrator
        .register_subscriptions()
        .await
        .context("Failed to register subscriptions")?;

    println!("{} {} subscriptions registered", style("✓").green().bold(), ids.len());
    for id in ids {
        println!("  {}", id);
    }

    Ok(())
}

/// Syncs right away after a write when auto sync is on
async fn push_changes(ctx: &AppContext) -> Result<()> {
    let changed = ctx.take_changed();
    if changed.is_empty() || !ctx.config.sync.auto_sync {
        return Ok(());
    }

    log::info!("{} collections changed, syncing", changed.len());
    let orchestrator = ctx.orchestrator(None).await?;
    let report = orchestrator.perform_full_sync().await;
    if let Some(error) = report.error() {
        println!(
            "{} Saved on this device; sync failed: {}",
            style("!").yellow().bold(),
            error.user_message()
        );
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    for phase in report.phases.iter().filter(|p| has_activity(p)) {
        println!(
            "  {:<22} up {} | down {} | pulled {} | deleted {}/{} | conflicts {} | skipped {}",
            phase.kind.to_string(),
            phase.uploaded,
            phase.downloaded,
            phase.pulled,
            phase.deleted_local,
            phase.deleted_remote,
            phase.conflicts,
            phase.skipped + phase.failed_records(),
        );
    }

    match &report.outcome {
        SyncOutcome::Success => println!(
            "{} Sync complete ({} up, {} pulled)",
            style("✓").green().bold(),
            report.uploaded(),
            report.pulled()
        ),
        SyncOutcome::ConflictsPending(count) => println!(
            "{} Sync complete with {} conflicts. Run 'momentum conflicts' to review.",
            style("!").yellow().bold(),
            count
        ),
        SyncOutcome::Failed(error) => {
            println!("{} {}", style("✗").red().bold(), error.user_message());
            println!("  {}", error.kind.explanation());
            println!("  Suggested: {}", error.kind.recovery_action());
        }
        SyncOutcome::Unavailable => println!(
            "{} Cloud account status could not be determined. Try again later.",
            style("!").yellow().bold()
        ),
        SyncOutcome::Skipped => println!("A sync is already running."),
    }
}

fn print_retry_hint(orchestrator: &SyncOrchestrator) {
    if let Some(delay) = orchestrator.pending_retry_delay() {
        println!(
            "  A retry was due in {}s; run 'momentum sync' again or use --watch.",
            delay.as_secs().max(1)
        );
        orchestrator.cancel_pending_retry();
    }
}

fn has_activity(phase: &momentum_sync::PhaseReport) -> bool {
    phase.uploaded
        + phase.pulled
        + phase.deleted_local
        + phase.deleted_remote
        + phase.conflicts
        + phase.skipped
        + phase.failed_records()
        > 0
}

fn describe_status(status: &SyncStatus) -> String {
    match status {
        SyncStatus::Idle => "idle".to_string(),
        SyncStatus::Syncing => "syncing".to_string(),
        SyncStatus::Success => style("up to date").green().to_string(),
        SyncStatus::Error(kind) => style(format!("error: {}", kind.user_message())).red().to_string(),
        SyncStatus::ConflictResolutionNeeded => style("conflicts need attention").yellow().to_string(),
        SyncStatus::TemporarilyUnavailable => "temporarily unavailable".to_string(),
    }
}

fn describe_version(version: &RecordVersion) -> String {
    match version {
        RecordVersion::Tombstone => "deleted".to_string(),
        RecordVersion::Present {
            payload,
            modified_at,
            ..
        } => format!(
            "{} (edited {})",
            records::summarize(payload),
            format_time(Some(*modified_at))
        ),
    }
}

fn clock() -> String {
    Timestamp::now()
        .to_datetime()
        .map(|d| d.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn format_time(time: Option<Timestamp>) -> String {
    time.and_then(|t| t.to_datetime())
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn kind_arg(matches: &ArgMatches) -> Result<EntityKind> {
    matches
        .get_one::<String>("kind")
        .ok_or_else(|| anyhow!("Record kind is required"))?
        .parse::<EntityKind>()
        .map_err(|e| anyhow!(e))
}

async fn id_arg(ctx: &AppContext, kind: EntityKind, matches: &ArgMatches) -> Result<RecordId> {
    let text = matches
        .get_one::<String>("id")
        .ok_or_else(|| anyhow!("Record ID is required"))?;
    dispatch_kind!(kind, |R| records::resolve_id::<R>(&ctx.store, text).await)
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((end, _)) => format!("{}...", &s[..end]),
    }
}

/// Prints a failed command the way a user should see it
///
/// Local store errors show their user message and recovery action; the
/// full error chain goes to the log.
pub fn report_error(err: &anyhow::Error) {
    let (message, hint) = describe_error(err);
    println!("{} {}", style("✗").red().bold(), message);
    if let Some(hint) = hint {
        println!("  Suggested: {}", hint);
    }
}

fn describe_error(err: &anyhow::Error) -> (String, Option<String>) {
    match err.chain().find_map(|e| e.downcast_ref::<AppError>()) {
        Some(app) => {
            if app.is_critical() {
                log::error!("{:#}", err);
            } else {
                log::debug!("{:#}", err);
            }
            (app.user_message(), Some(app.recovery_action().to_string()))
        }
        None => (format!("{:#}", err), None),
    }
}
