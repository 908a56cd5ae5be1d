// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The cron tick loop: every 30 seconds, instantiate due schedules and
//! advance their run markers. Long-running; stopped by process kill.

use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use tracing::info;

use capataz_core::application::scheduler::run_due_schedules;
use capataz_core::infrastructure::repositories::{ScheduleRepository, TaskRepository};

use crate::App;

const TICK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Subcommand)]
pub enum CronCommand {
    /// Run the cron tick loop (long-running)
    Tick,
}

pub async fn handle(app: &App, command: CronCommand) -> Result<()> {
    match command {
        CronCommand::Tick => tick_loop(app).await,
    }
}

async fn tick_loop(app: &App) -> Result<()> {
    let schedules = ScheduleRepository::new(app.db.pool().clone());
    let tasks = TaskRepository::new(app.db.pool().clone());

    info!("cron: starting tick loop (every 30s)");
    loop {
        match run_due_schedules(&schedules, &tasks).await {
            Ok(runs) => {
                for run in runs {
                    println!(
                        "cron: {:?} → {} tasks created (next: {})",
                        run.name,
                        run.created.len(),
                        run.next_run.format("%H:%M:%S")
                    );
                }
            }
            Err(e) => eprintln!("cron: error fetching due schedules: {}", e),
        }
        tokio::time::sleep(TICK_INTERVAL).await;
    }
}
