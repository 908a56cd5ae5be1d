// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Merge queue commands: drain one entry, watch continuously, show status.

use std::time::Duration;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use capataz_core::application::merge_drainer::{drain_one, DrainOutcome, ProcessedMerge};
use capataz_core::infrastructure::repositories::MergeQueueRepository;

use crate::output::relative_time;
use crate::App;

const IDLE_SLEEP: Duration = Duration::from_secs(5);

#[derive(Args)]
pub struct MergeArgs {
    /// Poll every 5s and process continuously
    #[arg(long)]
    watch: bool,

    #[command(subcommand)]
    command: Option<MergeCommand>,
}

#[derive(Subcommand)]
pub enum MergeCommand {
    /// Show merge queue status
    Status,
}

pub async fn handle(app: &App, args: MergeArgs) -> Result<()> {
    match args.command {
        Some(MergeCommand::Status) => print_queue(app).await,
        None if args.watch => watch_loop(app).await,
        None => drain_once(app).await,
    }
}

async fn drain_once(app: &App) -> Result<()> {
    match drain_one(&app.db).await? {
        Some(processed) => {
            report(&processed);
            Ok(())
        }
        None => {
            println!("No pending merge entries.");
            Ok(())
        }
    }
}

async fn watch_loop(app: &App) -> Result<()> {
    println!("Watching merge queue (Ctrl+C to stop)...");
    loop {
        match drain_one(&app.db).await {
            Ok(Some(processed)) => report(&processed),
            Ok(None) => tokio::time::sleep(IDLE_SLEEP).await,
            Err(e) => {
                eprintln!("error processing merge: {:#}", e);
                tokio::time::sleep(IDLE_SLEEP).await;
            }
        }
    }
}

fn report(processed: &ProcessedMerge) {
    let e = &processed.entry;
    println!(
        "Merging: #{} (task {}, branch {} → {})",
        e.id, e.task_id, e.branch, e.base_branch
    );
    match &processed.outcome {
        DrainOutcome::Merged { sha } => println!("  {}", format!("Merged: {}", sha).green()),
        DrainOutcome::Conflict { files } => println!(
            "  {}",
            format!("Conflict: {} file(s): {}", files.len(), files.join(", ")).yellow()
        ),
        DrainOutcome::Failed { error } => println!("  {}", format!("Failed: {}", error).red()),
    }
}

async fn print_queue(app: &App) -> Result<()> {
    let merges = MergeQueueRepository::new(app.db.pool().clone());
    let entries = merges.list().await?;

    if entries.is_empty() {
        println!("Merge queue is empty.");
        return Ok(());
    }

    println!(
        "{:<5} {:<22} {:<24} {:<10} {:<10} {}",
        "ID", "TASK", "BRANCH", "BASE", "STATUS", "ENQUEUED"
    );
    for e in &entries {
        println!(
            "{:<5} {:<22} {:<24} {:<10} {:<10} {}",
            e.id,
            e.task_id,
            e.branch,
            e.base_branch,
            e.status,
            relative_time(e.enqueued_at)
        );
    }
    Ok(())
}
