// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent lifecycle service
//!
//! Spawning wires three systems together: the agent row in the store, the
//! tmux window the worker runs in, and (optionally) an isolated git worktree
//! on a per-agent branch. Partial failures unwind what was already created;
//! kill-side cleanup is best-effort, preserving worktrees that still hold
//! unmerged work.

use anyhow::{Context, Result};
use tracing::warn;

use crate::infrastructure::repositories::AgentRepository;
use crate::infrastructure::{git, tmux, Database};

/// How to boot one worker.
pub struct SpawnOptions<'a> {
    pub tmux_session: &'a str,
    pub agent_id: &'a str,
    pub database_url: &'a str,
    /// Command line prefix that starts the worker process.
    pub worker_cmd: &'a str,
    /// Prompt file handed to the worker as its system instructions.
    pub prompt_path: &'a str,
    pub use_worktree: bool,
}

#[derive(Debug)]
pub struct SpawnedAgent {
    pub id: String,
    pub tmux_session: String,
    pub tmux_window: String,
    pub worktree_dir: Option<String>,
    pub branch: Option<String>,
}

/// Register the agent, open its tmux window, and send the bootstrap
/// command. Returns without waiting for the worker to claim anything.
pub async fn spawn_agent(db: &Database, opts: &SpawnOptions<'_>) -> Result<SpawnedAgent> {
    let agents = AgentRepository::new(db.pool().clone());

    let (worktree_dir, branch) = if opts.use_worktree {
        let root = git::repo_root()
            .await
            .context("worktree isolation requires a git repository")?;
        let dir = format!("{}/.capataz/worktrees/{}", root, opts.agent_id);
        let branch = format!("capataz/{}", opts.agent_id);
        git::worktree_add(&dir, &branch).await?;
        (Some(dir), Some(branch))
    } else {
        (None, None)
    };

    if let Err(e) = agents
        .register(
            opts.agent_id,
            opts.tmux_session,
            opts.agent_id,
            worktree_dir.as_deref(),
            branch.as_deref(),
        )
        .await
    {
        if let Some(dir) = &worktree_dir {
            if let Err(rm) = git::worktree_remove(dir).await {
                warn!(agent = opts.agent_id, "worktree cleanup failed: {}", rm);
            }
        }
        return Err(e).context("registering agent");
    }

    let mut env = vec![
        ("AGENT_ID".to_string(), opts.agent_id.to_string()),
        ("DATABASE_URL".to_string(), opts.database_url.to_string()),
    ];
    if let Some(dir) = &worktree_dir {
        env.push(("WORKTREE_DIR".to_string(), dir.clone()));
    }
    if let Some(b) = &branch {
        env.push(("BRANCH".to_string(), b.clone()));
    }

    if let Err(e) = tmux::new_window(
        opts.tmux_session,
        opts.agent_id,
        worktree_dir.as_deref(),
        &env,
    )
    .await
    {
        let _ = agents.remove(opts.agent_id).await;
        if let Some(dir) = &worktree_dir {
            if let Err(rm) = git::worktree_remove(dir).await {
                warn!(agent = opts.agent_id, "worktree cleanup failed: {}", rm);
            }
        }
        return Err(e).context("creating tmux window");
    }

    tmux::send_keys(
        opts.tmux_session,
        opts.agent_id,
        &format!("{} -p \"$(cat {})\"", opts.worker_cmd, opts.prompt_path),
    )
    .await?;

    Ok(SpawnedAgent {
        id: opts.agent_id.to_string(),
        tmux_session: opts.tmux_session.to_string(),
        tmux_window: opts.agent_id.to_string(),
        worktree_dir,
        branch,
    })
}

/// Kill an agent: close the window, clean up the worktree unless it still
/// holds unmerged commits, and drop the registration (which releases any
/// claim).
pub async fn kill_agent(
    db: &Database,
    tmux_session: &str,
    agent_id: &str,
    base_branch: &str,
) -> Result<()> {
    let agents = AgentRepository::new(db.pool().clone());
    let agent = agents.get(agent_id).await?;

    if let Err(e) = tmux::kill_window(tmux_session, agent_id).await {
        warn!(agent = agent_id, "kill-window failed: {}", e);
    }

    if let Some(agent) = &agent {
        if let (Some(dir), Some(branch)) = (&agent.worktree_dir, &agent.branch) {
            match git::has_unmerged_changes(branch, base_branch).await {
                Ok(true) => warn!(
                    agent = agent_id,
                    "preserving worktree {}: branch {} has unmerged changes", dir, branch
                ),
                Ok(false) => {
                    if let Err(e) = git::worktree_remove(dir).await {
                        warn!(agent = agent_id, "failed to remove worktree {}: {}", dir, e);
                    }
                }
                Err(e) => warn!(
                    agent = agent_id,
                    "could not check unmerged changes: {}", e
                ),
            }
        }
    }

    agents
        .remove(agent_id)
        .await
        .context("removing agent registration")?;
    Ok(())
}

/// Kill every registered agent, continuing past individual failures.
pub async fn kill_all_agents(db: &Database, tmux_session: &str, base_branch: &str) -> Result<()> {
    let agents = AgentRepository::new(db.pool().clone());
    for agent in agents.list().await? {
        if let Err(e) = kill_agent(db, tmux_session, &agent.id, base_branch).await {
            warn!(agent = %agent.id, "failed to kill agent: {}", e);
        }
    }
    Ok(())
}
