// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Schedule management: create, list, run immediately, enable, disable.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};

use capataz_core::application::scheduler::instantiate_template;
use capataz_core::domain::schedule::{next_cron_run, parse_template};
use capataz_core::infrastructure::repositories::{ScheduleRepository, TaskRepository};

use crate::App;

use super::project_or_env;

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// Create a schedule
    Add(AddArgs),
    /// List schedules
    List(ListArgs),
    /// Immediately instantiate a schedule's template
    Run {
        /// Schedule name
        name: String,
    },
    /// Enable a schedule (recomputes next_run)
    Enable {
        /// Schedule name
        name: String,
    },
    /// Disable a schedule
    Disable {
        /// Schedule name
        name: String,
    },
}

#[derive(Args)]
pub struct AddArgs {
    /// Schedule name
    name: String,

    /// Cron expression: minute hour day-of-month month day-of-week
    #[arg(long, required = true)]
    cron: String,

    /// Path to template JSON file
    #[arg(long, required = true)]
    template: String,

    /// Project id
    #[arg(long)]
    project: Option<String>,

    /// Schedule description
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by project
    #[arg(long)]
    project: Option<String>,
}

pub async fn handle(app: &App, command: ScheduleCommand) -> Result<()> {
    let schedules = ScheduleRepository::new(app.db.pool().clone());
    match command {
        ScheduleCommand::Add(args) => add(&schedules, args).await,
        ScheduleCommand::List(args) => list(&schedules, args).await,
        ScheduleCommand::Run { name } => run(app, &schedules, &name).await,
        ScheduleCommand::Enable { name } => enable(&schedules, &name).await,
        ScheduleCommand::Disable { name } => {
            schedules.set_enabled(&name, false, None).await?;
            Ok(())
        }
    }
}

async fn add(schedules: &ScheduleRepository, args: AddArgs) -> Result<()> {
    let next_run = next_cron_run(&args.cron, Utc::now())?;

    let raw = std::fs::read_to_string(&args.template)
        .with_context(|| format!("reading template {:?}", args.template))?;
    let template: serde_json::Value =
        serde_json::from_str(&raw).context("template must be valid JSON")?;
    parse_template(&template)?;

    schedules
        .create(
            &args.name,
            &args.cron,
            &template,
            project_or_env(args.project).as_deref(),
            args.description.as_deref(),
            next_run,
        )
        .await?;

    println!(
        "Created schedule {:?} (next run: {})",
        args.name,
        next_run.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

async fn list(schedules: &ScheduleRepository, args: ListArgs) -> Result<()> {
    let list = schedules.list(project_or_env(args.project).as_deref()).await?;

    if list.is_empty() {
        println!("No schedules.");
        return Ok(());
    }

    println!(
        "{:<20} {:<16} {:<20} {:<20} {}",
        "NAME", "CRON", "NEXT RUN", "LAST RUN", "ENABLED"
    );
    for s in &list {
        let fmt = |t: Option<chrono::DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "—".to_string())
        };
        println!(
            "{:<20} {:<16} {:<20} {:<20} {}",
            s.name,
            s.cron,
            fmt(s.next_run),
            fmt(s.last_run),
            if s.enabled { "yes" } else { "no" }
        );
    }
    Ok(())
}

async fn run(app: &App, schedules: &ScheduleRepository, name: &str) -> Result<()> {
    let schedule = schedules.get(name).await?;
    let tasks = TaskRepository::new(app.db.pool().clone());

    let ids =
        instantiate_template(&tasks, &schedule.template, schedule.project_id.as_deref()).await?;
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

async fn enable(schedules: &ScheduleRepository, name: &str) -> Result<()> {
    let schedule = schedules.get(name).await?;
    let next_run = next_cron_run(&schedule.cron, Utc::now())?;
    schedules.set_enabled(name, true, Some(next_run)).await?;
    println!(
        "Enabled {:?} (next run: {})",
        name,
        next_run.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}
