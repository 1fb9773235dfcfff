// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use momentum_config::ConfigManager;
use std::path::PathBuf;

mod commands;
mod context;
mod records;

use context::AppContext;

fn kind_arg() -> Arg {
    Arg::new("kind")
        .required(true)
        .value_name("KIND")
        .help("Record kind: task, goal, event, journal, account, transaction, subscription, budget, savings-goal, category")
}

fn id_arg(help: &'static str) -> Arg {
    Arg::new("id").required(true).value_name("ID").help(help)
}

pub(crate) fn build_cli() -> Command {
    Command::new("momentum")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Momentum Developers")
        .about("Planner and personal-finance records with conflict-aware cloud sync")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml (defaults to the platform config dir)")
                .global(true),
        )
        .subcommand(Command::new("init").about("Create the default configuration and data directories"))
        .subcommand(Command::new("config").about("Show the effective configuration"))
        .subcommand(
            Command::new("add")
                .about("Add a record")
                .arg(kind_arg())
                .arg(Arg::new("name").required(true).value_name("NAME").help("Title or name"))
                .arg(Arg::new("amount").short('a').long("amount").value_name("AMOUNT").allow_hyphen_values(true).help("Amount, balance, limit or target (e.g. 12.50)"))
                .arg(Arg::new("date").short('d').long("date").value_name("YYYY-MM-DD").help("Due, entry, transaction or start date"))
                .arg(Arg::new("start").long("start").value_name("YYYY-MM-DD HH:MM").help("Event start (UTC)"))
                .arg(Arg::new("end").long("end").value_name("YYYY-MM-DD HH:MM").help("Event end (UTC, defaults to one hour after start)"))
                .arg(Arg::new("notes").short('n').long("notes").value_name("TEXT").help("Notes, description, body or location"))
                .arg(Arg::new("priority").short('p').long("priority").value_name("PRIORITY").value_parser(["low", "medium", "high"]).help("Task priority"))
                .arg(Arg::new("type").short('t').long("type").value_name("TYPE").value_parser(["income", "expense"]).help("Transaction direction"))
                .arg(Arg::new("cycle").long("cycle").value_name("CYCLE").value_parser(["weekly", "monthly", "quarterly", "yearly"]).help("Subscription billing cycle"))
                .arg(Arg::new("account-type").long("account-type").value_name("TYPE").value_parser(["checking", "savings", "credit-card", "cash", "investment"]).help("Account type"))
                .arg(Arg::new("color").long("color").value_name("#RRGGBB").help("Category color")),
        )
        .subcommand(Command::new("list").about("List records of one kind").arg(kind_arg()))
        .subcommand(
            Command::new("show")
                .about("Show a record in full")
                .arg(kind_arg())
                .arg(id_arg("Record ID or a unique prefix of it")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a record")
                .arg(kind_arg())
                .arg(id_arg("Record ID or unique prefix to delete"))
                .arg(Arg::new("force").short('f').long("force").help("Skip confirmation prompt").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("complete")
                .about("Mark a task complete")
                .arg(id_arg("Task ID or a unique prefix of it")),
        )
        .subcommand(
            Command::new("sync")
                .about("Synchronize with the cloud record store")
                .arg(Arg::new("scope").short('s').long("scope").value_name("SCOPE").value_parser(["planner", "finance", "all"]).help("Collections to sync (defaults to the configured scope)"))
                .arg(Arg::new("watch").short('w').long("watch").help("Keep syncing on the configured interval until interrupted").action(ArgAction::SetTrue)),
        )
        .subcommand(Command::new("status").about("Show sync status"))
        .subcommand(Command::new("conflicts").about("List records changed on both sides"))
        .subcommand(
            Command::new("resolve")
                .about("Resolve a conflict by keeping one version")
                .arg(id_arg("Conflict ID"))
                .arg(Arg::new("keep").short('k').long("keep").required(true).value_name("SIDE").value_parser(["local", "server"]).help("Version to keep")),
        )
        .subcommand(Command::new("stats").about("Show record counts per kind"))
        .subcommand(Command::new("subscribe").about("Register change subscriptions with the cloud store"))
}

fn config_manager(matches: &clap::ArgMatches) -> Result<ConfigManager> {
    match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    }
    .context("Failed to locate configuration directory")
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        commands::report_error(&err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;

    let default_level = manager.load_or_default().app.log_level.to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if let Some(("init", _)) = matches.subcommand() {
        return commands::init(&manager).await;
    }

    let ctx = AppContext::load(&manager).await?;

    match matches.subcommand() {
        Some(("config", _)) => {
            commands::show_config(&manager, &ctx);
            Ok(())
        }
        Some(("add", sub_matches)) => commands::add_record(&ctx, sub_matches).await,
        Some(("list", sub_matches)) => commands::list_records(&ctx, sub_matches).await,
        Some(("show", sub_matches)) => commands::show_record(&ctx, sub_matches).await,
        Some(("delete", sub_matches)) => commands::delete_record(&ctx, sub_matches).await,
        Some(("complete", sub_matches)) => commands::complete_task(&ctx, sub_matches).await,
        Some(("sync", sub_matches)) => commands::sync(&ctx, sub_matches).await,
        Some(("status", _)) => commands::status(&ctx).await,
        Some(("conflicts", _)) => commands::list_conflicts(&ctx).await,
        Some(("resolve", sub_matches)) => commands::resolve(&ctx, sub_matches).await,
        Some(("stats", _)) => commands::show_stats(&ctx).await,
        Some(("subscribe", _)) => commands::subscribe(&ctx).await,
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
