// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent management: spawn workers into tmux windows, list them, capture
//! their panes, kill them.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use capataz_core::application::lifecycle::{self, SpawnOptions};
use capataz_core::infrastructure::repositories::AgentRepository;
use capataz_core::infrastructure::{git, tmux};

use crate::output::{agent_symbol, dash, relative_time};
use crate::App;

use super::base_branch;

const DEFAULT_WORKER_CMD: &str = "claude --dangerously-skip-permissions";

fn worker_cmd() -> String {
    std::env::var("CAPATAZ_WORKER_CMD")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_WORKER_CMD.to_string())
}

/// Locate a prompt file relative to the working directory or the binary.
fn find_prompt(name: &str) -> Result<String> {
    let mut candidates = vec![std::path::PathBuf::from("prompts").join(name)];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("prompts").join(name));
        }
    }
    for c in &candidates {
        if c.exists() {
            return Ok(c
                .canonicalize()
                .unwrap_or_else(|_| c.clone())
                .display()
                .to_string());
        }
    }
    bail!("prompts/{} not found (run from project root)", name)
}

pub async fn agents(app: &App) -> Result<()> {
    let repo = AgentRepository::new(app.db.pool().clone());
    let list = repo.list().await?;

    if list.is_empty() {
        println!("No agents.");
        return Ok(());
    }

    println!(
        "{:<3}{:<20} {:<9} {:<22} {:<24} {}",
        "", "AGENT", "STATUS", "TASK", "BRANCH", "LAST SEEN"
    );
    for a in &list {
        println!(
            "{:<3}{:<20} {:<9} {:<22} {:<24} {}",
            agent_symbol(a.status),
            a.id,
            a.status,
            dash(a.task_id.as_deref()),
            dash(a.branch.as_deref()),
            a.last_seen.map(relative_time).unwrap_or_else(|| "—".into())
        );
    }
    Ok(())
}

#[derive(Args)]
pub struct SpawnArgs {
    /// Agent name
    name: String,

    /// Isolate the agent in a git worktree
    #[arg(long)]
    worktrees: bool,
}

pub async fn spawn(app: &App, args: SpawnArgs) -> Result<()> {
    tmux::ensure_session(&app.session).await?;
    preflight_worktrees(args.worktrees).await?;
    let prompt = find_prompt("WORKER.md")?;

    let spawned = lifecycle::spawn_agent(
        &app.db,
        &SpawnOptions {
            tmux_session: &app.session,
            agent_id: &args.name,
            database_url: &app.database_url,
            worker_cmd: &worker_cmd(),
            prompt_path: &prompt,
            use_worktree: args.worktrees,
        },
    )
    .await
    .with_context(|| format!("spawning {}", args.name))?;

    print_spawned(&spawned);
    Ok(())
}

#[derive(Args)]
pub struct RunArgs {
    /// Number of agents to spawn
    #[arg(long, default_value_t = 1)]
    agents: u32,

    /// Comma-separated agent names (overrides --agents)
    #[arg(long)]
    names: Option<String>,

    /// Attach to the tmux session after spawning
    #[arg(long)]
    attach: bool,

    /// Isolate each agent in a git worktree
    #[arg(long)]
    worktrees: bool,
}

pub async fn run(app: &App, args: RunArgs) -> Result<()> {
    tmux::ensure_session(&app.session).await?;
    preflight_worktrees(args.worktrees).await?;
    let prompt = find_prompt("WORKER.md")?;

    let names: Vec<String> = match &args.names {
        Some(csv) => csv.split(',').map(|s| s.trim().to_string()).collect(),
        None => {
            let pid = std::process::id();
            (1..=args.agents)
                .map(|i| format!("agent-{}-{}", pid, i))
                .collect()
        }
    };

    for name in &names {
        let spawned = lifecycle::spawn_agent(
            &app.db,
            &SpawnOptions {
                tmux_session: &app.session,
                agent_id: name,
                database_url: &app.database_url,
                worker_cmd: &worker_cmd(),
                prompt_path: &prompt,
                use_worktree: args.worktrees,
            },
        )
        .await
        .with_context(|| format!("spawning {}", name))?;
        print_spawned(&spawned);
    }

    if args.attach {
        tmux::attach_or_switch(&app.session, None).await?;
    }
    Ok(())
}

async fn preflight_worktrees(enabled: bool) -> Result<()> {
    if !enabled {
        return Ok(());
    }
    git::repo_root()
        .await
        .context("--worktrees requires a git repository")?;
    if git::has_uncommitted_changes().await.unwrap_or(false) {
        println!("{}", "warning: working tree has uncommitted changes".yellow());
    }
    Ok(())
}

fn print_spawned(a: &lifecycle::SpawnedAgent) {
    match (&a.worktree_dir, &a.branch) {
        (Some(dir), Some(branch)) => println!(
            "Spawned: {}  →  {}:{}  (worktree: {}, branch: {})",
            a.id, a.tmux_session, a.tmux_window, dir, branch
        ),
        _ => println!("Spawned: {}  →  {}:{}", a.id, a.tmux_session, a.tmux_window),
    }
}

#[derive(Args)]
pub struct KillArgs {
    /// Agent id
    id: Option<String>,

    /// Kill all agents
    #[arg(long)]
    all: bool,
}

pub async fn kill(app: &App, args: KillArgs) -> Result<()> {
    let base = base_branch();

    if args.all {
        lifecycle::kill_all_agents(&app.db, &app.session, &base).await?;
        println!("{}", "✓ All agents killed.".green());
        return Ok(());
    }

    let Some(id) = &args.id else {
        bail!("specify an agent id or use --all");
    };
    lifecycle::kill_agent(&app.db, &app.session, id, &base).await?;
    println!("{}", format!("✓ Killed agent {}", id).green());
    Ok(())
}

#[derive(Args)]
pub struct LogsArgs {
    /// Agent id
    id: String,

    /// Number of lines to capture
    #[arg(long, default_value_t = 50)]
    lines: u32,
}

pub async fn logs(app: &App, args: LogsArgs) -> Result<()> {
    let repo = AgentRepository::new(app.db.pool().clone());
    let Some(agent) = repo.get(&args.id).await? else {
        bail!("agent {:?} not found", args.id);
    };

    let output = tmux::capture_pane(&agent.tmux_session, &agent.tmux_window, args.lines).await?;
    println!("{}", output);
    Ok(())
}
