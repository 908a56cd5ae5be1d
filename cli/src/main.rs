// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # capataz CLI
//!
//! Agent task coordination via tmux + PostgreSQL. One binary carries both
//! surfaces:
//!
//! - **Operator commands** — create and inspect tasks, approve, release
//!   drafts, spawn and kill workers, drain the merge queue, manage
//!   schedules and planner sessions.
//! - **Worker ABI** — `claim`, `pick`, `observe`, `handoff`, `done`,
//!   `fail`. Workers shell out to these from their tmux windows; a contract
//!   violation exits nonzero with a one-line diagnostic.
//!
//! The store connection comes from `--db` or `DATABASE_URL`; most filters
//! default from `CAPATAZ_PROJECT` and the tmux session from
//! `CAPATAZ_SESSION`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use capataz_core::Database;

mod commands;
mod output;

use commands::{agent, cron, merge, planner, prompt, schedule, store, task, worker};

#[derive(Parser)]
#[command(name = "capataz")]
#[command(version, about = "Agent task coordination via tmux + PostgreSQL")]
#[command(propagate_version = true)]
struct Cli {
    /// Database URL (overrides DATABASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    db: Option<String>,

    /// tmux session name (overrides CAPATAZ_SESSION)
    #[arg(long, global = true, value_name = "NAME")]
    session: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CAPATAZ_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add(task::AddArgs),
    /// Table view of all tasks
    Status(task::StatusArgs),
    /// Print task spec + full context log
    Show(task::ShowArgs),
    /// Print dependency tree with status symbols
    Tree(task::TreeArgs),
    /// Open task body in $EDITOR
    Edit(task::EditArgs),
    /// Approve a pending_approval task
    Approve(task::ApproveArgs),
    /// Reject a pending_approval task
    Reject(task::RejectArgs),
    /// Release a claimed task back to ready
    Unclaim(task::UnclaimArgs),
    /// Reset stale claimed tasks back to ready
    Reclaim(task::ReclaimArgs),
    /// Release draft tasks for execution
    #[command(name = "draft-release")]
    DraftRelease(task::DraftReleaseArgs),
    /// Full-text search across task context
    Search(task::SearchArgs),

    /// Claim the next ready task (worker ABI)
    Claim(worker::ClaimArgs),
    /// Claim a specific task by id (worker ABI)
    Pick(worker::PickArgs),
    /// Record an observation on a claimed task (worker ABI)
    Observe(worker::NoteArgs),
    /// Record a handoff note on a claimed task (worker ABI)
    Handoff(worker::NoteArgs),
    /// Mark a claimed task done (worker ABI)
    Done(worker::DoneArgs),
    /// Report a failed attempt (worker ABI)
    Fail(worker::FailArgs),

    /// Show running agents + what they own
    Agents,
    /// Spawn a single named agent
    Spawn(agent::SpawnArgs),
    /// Spawn agents in tmux
    Run(agent::RunArgs),
    /// Kill agent(s), release their claimed tasks
    Kill(agent::KillArgs),
    /// Capture last N lines from an agent's tmux window
    Logs(agent::LogsArgs),

    /// Process merge queue entries
    Merge(merge::MergeArgs),

    /// Run pending database migrations
    Migrate,
    /// Start the Docker postgres container
    Up,
    /// Stop the Docker postgres container
    Down,

    /// Manage recurring schedules
    Schedule {
        #[command(subcommand)]
        command: schedule::ScheduleCommand,
    },
    /// Cron daemon for recurring schedules
    Cron {
        #[command(subcommand)]
        command: cron::CronCommand,
    },
    /// Manage planner sessions
    Planner {
        #[command(subcommand)]
        command: planner::PlannerCommand,
    },
    /// Generate self-contained worker prompts
    Prompt {
        #[command(subcommand)]
        command: prompt::PromptCommand,
    },
}

/// Per-invocation context shared by command handlers.
pub struct App {
    pub db: Database,
    pub database_url: String,
    pub session: String,
}

impl App {
    async fn connect(cli: &Cli) -> Result<Self> {
        let database_url = match &cli.db {
            Some(url) => url.clone(),
            None => match std::env::var("DATABASE_URL") {
                Ok(url) if !url.is_empty() => url,
                _ => bail!("DATABASE_URL not set (use --db or the environment)"),
            },
        };
        let db = Database::connect(&database_url)
            .await
            .context("connecting to database")?;
        Ok(Self {
            db,
            database_url,
            session: session_name(cli),
        })
    }
}

fn session_name(cli: &Cli) -> String {
    cli.session
        .clone()
        .or_else(|| {
            std::env::var("CAPATAZ_SESSION")
                .ok()
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "capataz".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    // Store lifecycle needs no connection.
    match &cli.command {
        Commands::Up => return store::up().await,
        Commands::Down => return store::down().await,
        _ => {}
    }

    let app = App::connect(&cli).await?;

    match cli.command {
        Commands::Add(args) => task::add(&app, args).await,
        Commands::Status(args) => task::status(&app, args).await,
        Commands::Show(args) => task::show(&app, args).await,
        Commands::Tree(args) => task::tree(&app, args).await,
        Commands::Edit(args) => task::edit(&app, args).await,
        Commands::Approve(args) => task::approve(&app, args).await,
        Commands::Reject(args) => task::reject(&app, args).await,
        Commands::Unclaim(args) => task::unclaim(&app, args).await,
        Commands::Reclaim(args) => task::reclaim(&app, args).await,
        Commands::DraftRelease(args) => task::draft_release(&app, args).await,
        Commands::Search(args) => task::search(&app, args).await,

        Commands::Claim(args) => worker::claim(&app, args).await,
        Commands::Pick(args) => worker::pick(&app, args).await,
        Commands::Observe(args) => worker::observe(&app, args).await,
        Commands::Handoff(args) => worker::handoff(&app, args).await,
        Commands::Done(args) => worker::done(&app, args).await,
        Commands::Fail(args) => worker::fail(&app, args).await,

        Commands::Agents => agent::agents(&app).await,
        Commands::Spawn(args) => agent::spawn(&app, args).await,
        Commands::Run(args) => agent::run(&app, args).await,
        Commands::Kill(args) => agent::kill(&app, args).await,
        Commands::Logs(args) => agent::logs(&app, args).await,

        Commands::Merge(args) => merge::handle(&app, args).await,

        Commands::Migrate => store::migrate(&app).await,
        Commands::Up | Commands::Down => unreachable!("handled above"),

        Commands::Schedule { command } => schedule::handle(&app, command).await,
        Commands::Cron { command } => cron::handle(&app, command).await,
        Commands::Planner { command } => planner::handle(&app, command).await,
        Commands::Prompt { command } => prompt::handle(&app, command).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
