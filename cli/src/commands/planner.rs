// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Planner session commands. A planner is an interactive worker in its own
//! tmux window that turns a discussion topic into draft task DAGs.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use capataz_core::domain::planner::PlannerStatus;
use capataz_core::infrastructure::repositories::PlannerRepository;
use capataz_core::infrastructure::tmux;

use crate::App;

use super::project_or_env;

#[derive(Subcommand)]
pub enum PlannerCommand {
    /// Start a planner session in a tmux window
    Start(StartArgs),
    /// Stop a planner session
    Stop(TopicArgs),
    /// Reopen a stopped or crashed planner session
    Reopen(TopicArgs),
    /// Show planner sessions
    Status(StatusArgs),
}

#[derive(Args)]
pub struct StartArgs {
    /// Topic id
    #[arg(long)]
    topic: i64,

    /// Project id
    #[arg(long)]
    project: Option<String>,
}

#[derive(Args)]
pub struct TopicArgs {
    /// Topic id
    #[arg(long)]
    topic: i64,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Filter by project
    #[arg(long)]
    project: Option<String>,
}

pub async fn handle(app: &App, command: PlannerCommand) -> Result<()> {
    let planners = PlannerRepository::new(app.db.pool().clone());
    match command {
        PlannerCommand::Start(args) => start(app, &planners, args).await,
        PlannerCommand::Stop(args) => stop(app, &planners, args).await,
        PlannerCommand::Reopen(args) => reopen(app, &planners, args).await,
        PlannerCommand::Status(args) => status(&planners, args).await,
    }
}

fn window_name(topic: i64) -> String {
    format!("planner-{}", topic)
}

fn planner_bootstrap(prompt_path: &str) -> String {
    let worker = std::env::var("CAPATAZ_WORKER_CMD")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "claude --dangerously-skip-permissions".to_string());
    format!("{} -p \"$(cat {})\"", worker, prompt_path)
}

fn find_planner_prompt() -> Result<String> {
    let candidate = std::path::Path::new("prompts/PLANNER.md");
    if candidate.exists() {
        return Ok(candidate
            .canonicalize()
            .unwrap_or_else(|_| candidate.to_path_buf())
            .display()
            .to_string());
    }
    bail!("prompts/PLANNER.md not found (run from project root)")
}

async fn start(app: &App, planners: &PlannerRepository, args: StartArgs) -> Result<()> {
    let Some(project) = project_or_env(args.project) else {
        bail!("--project is required");
    };

    if let Some(existing) = planners.get(args.topic).await? {
        if existing.status == PlannerStatus::Running {
            bail!("planner already running for topic {}", args.topic);
        }
    }

    let window = window_name(args.topic);
    tmux::ensure_session(&app.session).await?;

    let env = vec![
        ("DATABASE_URL".to_string(), app.database_url.clone()),
        ("CAPATAZ_PROJECT".to_string(), project.clone()),
    ];
    tmux::new_window(&app.session, &window, None, &env).await?;

    if let Err(e) = planners
        .upsert(args.topic, Some(&project), &window, PlannerStatus::Running)
        .await
    {
        let _ = tmux::kill_window(&app.session, &window).await;
        return Err(e.into());
    }

    let prompt = find_planner_prompt()?;
    tmux::send_keys(&app.session, &window, &planner_bootstrap(&prompt)).await?;

    println!(
        "Planner started: topic={} window={} project={}",
        args.topic, window, project
    );
    Ok(())
}

async fn stop(app: &App, planners: &PlannerRepository, args: TopicArgs) -> Result<()> {
    let Some(session) = planners.get(args.topic).await? else {
        bail!("no planner session for topic {}", args.topic);
    };

    if let Some(window) = &session.tmux_window {
        let _ = tmux::kill_window(&app.session, window).await;
    }
    planners.stop(args.topic).await?;

    println!("Planner stopped: topic={}", args.topic);
    Ok(())
}

async fn reopen(app: &App, planners: &PlannerRepository, args: TopicArgs) -> Result<()> {
    let window = window_name(args.topic);
    let session = planners.reopen(args.topic, &window).await?;

    tmux::ensure_session(&app.session).await?;

    let mut env = vec![("DATABASE_URL".to_string(), app.database_url.clone())];
    if let Some(project) = &session.project_id {
        env.push(("CAPATAZ_PROJECT".to_string(), project.clone()));
    }
    tmux::new_window(&app.session, &window, None, &env).await?;

    let prompt = find_planner_prompt()?;
    tmux::send_keys(&app.session, &window, &planner_bootstrap(&prompt)).await?;

    println!("Planner reopened: topic={} window={}", args.topic, window);
    Ok(())
}

async fn status(planners: &PlannerRepository, args: StatusArgs) -> Result<()> {
    let sessions = planners.list(project_or_env(args.project).as_deref()).await?;

    if sessions.is_empty() {
        println!("No planner sessions.");
        return Ok(());
    }

    println!(
        "{:<10} {:<16} {:<16} {:<9} {}",
        "TOPIC", "PROJECT", "WINDOW", "STATUS", "STARTED AT"
    );
    for s in &sessions {
        println!(
            "{:<10} {:<16} {:<16} {:<9} {}",
            s.topic_id,
            s.project_id.as_deref().unwrap_or(""),
            s.tmux_window.as_deref().unwrap_or(""),
            s.status,
            s.started_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        );
    }
    Ok(())
}
