// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Worker ABI
//!
//! The operations worker processes shell out to from their tmux windows.
//! `claim` prints the claimed task (with its full context log, inherited
//! entries included) as JSON, or nothing at all when the queue is empty —
//! workers treat empty output as "stop looping". Guard violations exit
//! nonzero with a one-line diagnostic.

use anyhow::{Context, Result};
use clap::Args;

use capataz_core::domain::agent::AgentStatus;
use capataz_core::domain::task::Task;
use capataz_core::infrastructure::git;
use capataz_core::infrastructure::repositories::{
    AgentRepository, ClaimEngine, ContextRepository, MergeQueueRepository, TaskRepository,
};

use crate::App;

use super::{base_branch, project_or_env};

#[derive(Args)]
pub struct ClaimArgs {
    /// Agent identity (or AGENT_ID env)
    #[arg(long, env = "AGENT_ID")]
    agent: String,

    /// Only claim tasks from this project
    #[arg(long)]
    project: Option<String>,
}

pub async fn claim(app: &App, args: ClaimArgs) -> Result<()> {
    let engine = ClaimEngine::new(app.db.pool().clone());
    let project = project_or_env(args.project);

    match engine.claim_next(&args.agent, project.as_deref()).await? {
        Some(task) => print_claimed(app, &task).await,
        None => Ok(()), // Nothing claimable; empty output by contract.
    }
}

#[derive(Args)]
pub struct PickArgs {
    /// Task id (partial ok)
    id: String,

    /// Agent identity (or AGENT_ID env)
    #[arg(long, env = "AGENT_ID")]
    agent: String,
}

pub async fn pick(app: &App, args: PickArgs) -> Result<()> {
    let engine = ClaimEngine::new(app.db.pool().clone());
    let task = engine.claim_by_id(&args.id, &args.agent).await?;
    print_claimed(app, &task).await
}

async fn print_claimed(app: &App, task: &Task) -> Result<()> {
    let contexts = ContextRepository::new(app.db.pool().clone());
    let context = contexts.list_for_task(&task.id).await?;
    let out = serde_json::json!({ "task": task, "context": context });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[derive(Args)]
pub struct NoteArgs {
    /// Task id (partial ok)
    id: String,

    /// Note text
    text: String,

    /// Agent identity (or AGENT_ID env)
    #[arg(long, env = "AGENT_ID")]
    agent: String,
}

pub async fn observe(app: &App, args: NoteArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let contexts = ContextRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;
    contexts.add_observation(&id, &args.agent, &args.text).await?;
    note_heartbeat(app, &args.agent).await
}

pub async fn handoff(app: &App, args: NoteArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let contexts = ContextRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;
    contexts.add_handoff(&id, &args.agent, &args.text).await?;
    note_heartbeat(app, &args.agent).await
}

/// Notes double as liveness: bump the agent's last_seen so it doesn't look
/// stale while it works.
async fn note_heartbeat(app: &App, agent_id: &str) -> Result<()> {
    let agents = AgentRepository::new(app.db.pool().clone());
    agents.heartbeat(agent_id, AgentStatus::Working).await?;
    Ok(())
}

#[derive(Args)]
pub struct DoneArgs {
    /// Task id (partial ok)
    id: String,

    /// Result summary
    summary: String,

    /// Agent identity (or AGENT_ID env)
    #[arg(long, env = "AGENT_ID")]
    agent: String,
}

/// Mark the task done. Worktree-isolated agents additionally get their
/// branch committed and queued for integration.
pub async fn done(app: &App, args: DoneArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;

    tasks.mark_done(&id, &args.agent, &args.summary).await?;
    println!("Done: {}", id);

    let agents = AgentRepository::new(app.db.pool().clone());
    let Some(agent) = agents.get(&args.agent).await? else {
        return Ok(());
    };
    let (Some(worktree), Some(branch)) = (&agent.worktree_dir, &agent.branch) else {
        return Ok(());
    };

    let message = format!("task {}: {}", id, args.summary);
    let sha = git::add_and_commit(worktree, &message)
        .await
        .context("committing worktree")?;
    if sha.is_none() && !git::has_unmerged_changes(branch, &base_branch()).await? {
        return Ok(()); // Nothing on the branch to integrate.
    }

    let merges = MergeQueueRepository::new(app.db.pool().clone());
    let entry_id = merges
        .enqueue(
            &id,
            &args.agent,
            branch,
            worktree,
            &base_branch(),
            sha.as_deref(),
        )
        .await?;
    println!("Enqueued merge #{} ({} → {})", entry_id, branch, base_branch());
    Ok(())
}

#[derive(Args)]
pub struct FailArgs {
    /// Task id (partial ok)
    id: String,

    /// Failure output (test log, error message)
    output: String,

    /// Agent identity (or AGENT_ID env)
    #[arg(long, env = "AGENT_ID")]
    agent: String,
}

pub async fn fail(app: &App, args: FailArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;
    let reached = tasks.record_failure(&id, &args.agent, &args.output).await?;
    println!("Failed attempt on {}: now {}", id, reached);
    Ok(())
}
