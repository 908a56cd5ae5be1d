// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task lifecycle commands: creation, inspection, approval gate, draft
//! release, reclaim, and context search.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use capataz_core::domain::task::{generate_task_id, TaskStatus};
use capataz_core::domain::tree::{project_forest, TaskForest};
use capataz_core::infrastructure::repositories::{
    ContextRepository, NewTask, TaskRepository,
};

use crate::output::{dash, relative_time, status_symbol, truncate_id};
use crate::App;

use super::project_or_env;

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    #[arg(required = true)]
    title: Vec<String>,

    /// Dependency task id (partial ok, repeatable)
    #[arg(long)]
    after: Vec<String>,

    /// Priority 0-10, higher first
    #[arg(long, default_value_t = 5)]
    priority: i32,

    /// Test command override, stored in task metadata
    #[arg(long)]
    test_cmd: Option<String>,

    /// Project id (or CAPATAZ_PROJECT env)
    #[arg(long)]
    project: Option<String>,

    /// Task body/specification
    #[arg(long, default_value = "")]
    body: String,

    /// Initial task status: ready or draft
    #[arg(long, default_value = "ready", value_parser = ["ready", "draft"])]
    status: String,

    /// Require human approval before execution
    #[arg(long)]
    requires_approval: bool,

    /// Attempt budget before the task is marked failed
    #[arg(long)]
    max_attempts: Option<i32>,
}

pub async fn add(app: &App, args: AddArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());

    let title = args.title.join(" ");
    let id = generate_task_id(&title);
    let metadata = args
        .test_cmd
        .as_ref()
        .map(|cmd| serde_json::json!({ "test_cmd": cmd }));

    tasks
        .create(
            &NewTask {
                id: id.clone(),
                title: title.clone(),
                body: args.body,
                priority: args.priority,
                project_id: project_or_env(args.project),
                metadata,
                requires_approval: args.requires_approval,
                max_attempts: args.max_attempts,
            },
            TaskStatus::Pending,
        )
        .await?;

    for dep in &args.after {
        let resolved = tasks
            .resolve_prefix(dep)
            .await
            .with_context(|| format!("resolving dependency {:?}", dep))?;
        tasks.add_dependency(&id, &resolved).await?;
    }

    // Draft wins over everything; the approval gate over readiness.
    if args.status == "draft" {
        tasks.set_status(&id, TaskStatus::Draft).await?;
    } else if args.requires_approval {
        tasks.set_status(&id, TaskStatus::PendingApproval).await?;
    } else if !tasks.has_unmet_deps(&id).await? {
        tasks.set_status(&id, TaskStatus::Ready).await?;
    }

    println!("Created: {}  {:?}", id, title);
    Ok(())
}

#[derive(Args)]
pub struct StatusArgs {
    /// Filter by project id
    #[arg(long)]
    project: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn status(app: &App, args: StatusArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let project = project_or_env(args.project);
    let list = tasks.list(project.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if list.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!(
        "{:<3}{:<22} {:<36} {:<17} {:<14} {}",
        "", "ID", "TITLE", "STATUS", "CLAIMED BY", "ATTEMPT"
    );
    for t in &list {
        println!(
            "{:<3}{:<22} {:<36} {:<17} {:<14} {}/{}",
            status_symbol(t.status),
            truncate_id(&t.id),
            t.title,
            t.status,
            dash(t.claimed_by.as_deref()),
            t.attempt,
            t.max_attempts
        );
    }
    Ok(())
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task id (partial ok)
    id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub async fn show(app: &App, args: ShowArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let (task, context) = tasks.get_with_context(&args.id).await?;

    if args.json {
        let out = serde_json::json!({ "task": task, "context": context });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let pad = 60usize.saturating_sub(task.id.len());
    println!("── Task: {} {}", task.id, "─".repeat(pad));
    println!("Title:    {}", task.title);
    print!("Status:   {} {}", status_symbol(task.status), task.status);
    if matches!(task.status, TaskStatus::Claimed | TaskStatus::Ready) {
        print!(" (attempt {}/{})", task.attempt, task.max_attempts);
    }
    println!();
    println!("Priority: {}", task.priority);
    if let Some(by) = &task.claimed_by {
        println!("Claimed by: {}", by);
    }
    if let Some(project) = &task.project_id {
        println!("Project:  {}", project);
    }

    if !task.body.is_empty() {
        println!("\nBody:\n{}", task.body);
    }

    if !context.is_empty() {
        println!("\n── Context {}", "─".repeat(60));
        for entry in &context {
            let ts = entry.created_at.format("%H:%M:%S");
            let kind = entry.kind.as_str().to_uppercase();
            let mut header = format!("[{}] {}  ({})", ts, kind, dash(entry.agent_id.as_deref()));
            if let Some(source) = &entry.source_task {
                header.push_str(&format!("  from: {}", source));
            }
            println!("{}", header);
            for line in entry.content.lines() {
                println!("  {}", line);
            }
            println!();
        }
    }
    Ok(())
}

#[derive(Args)]
pub struct TreeArgs {
    /// Filter by project id
    #[arg(long)]
    project: Option<String>,
}

pub async fn tree(app: &App, args: TreeArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let project = project_or_env(args.project);

    let list = tasks.list(project.as_deref()).await?;
    let edges = tasks.list_dependency_edges().await?;
    let forest = project_forest(list, &edges);

    if forest.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    for &root in forest.roots() {
        print_node(&forest, root, "", true);
    }
    Ok(())
}

fn print_node(forest: &TaskForest, idx: usize, prefix: &str, is_last: bool) {
    let node = forest.node(idx);
    let sym = status_symbol(node.task.status);
    if prefix.is_empty() {
        println!("  {}  {}  {}", sym, truncate_id(&node.task.id), node.task.title);
    } else {
        let connector = if is_last { "└── " } else { "├── " };
        println!(
            "{}{}{}  {}  {}",
            prefix,
            connector,
            sym,
            truncate_id(&node.task.id),
            node.task.title
        );
    }

    let child_prefix = if prefix.is_empty() {
        "  ".to_string()
    } else if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let children = &node.children;
    for (i, &child) in children.iter().enumerate() {
        print_node(forest, child, &child_prefix, i == children.len() - 1);
    }
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id (partial ok)
    id: String,
}

pub async fn edit(app: &App, args: EditArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let task = tasks.get(&args.id).await?;

    let tmp = std::env::temp_dir().join(format!("capataz-edit-{}.md", std::process::id()));
    std::fs::write(&tmp, &task.body).context("writing temp file")?;

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = std::process::Command::new(&editor)
        .arg(&tmp)
        .status()
        .with_context(|| format!("launching editor {:?}", editor))?;
    if !status.success() {
        let _ = std::fs::remove_file(&tmp);
        bail!("editor exited with {}", status);
    }

    let new_body = std::fs::read_to_string(&tmp).context("reading temp file")?;
    let _ = std::fs::remove_file(&tmp);

    if new_body == task.body {
        println!("No changes.");
        return Ok(());
    }

    tasks.update_body(&task.id, &task.title, &new_body).await?;
    println!("{}", format!("✓ Updated body for {}", task.id).green());
    Ok(())
}

#[derive(Args)]
pub struct ApproveArgs {
    /// Task id (partial ok)
    id: String,

    /// Approver identity (or APPROVER_ID env)
    #[arg(long)]
    by: Option<String>,
}

pub async fn approve(app: &App, args: ApproveArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;

    let actor = args
        .by
        .or_else(|| std::env::var("APPROVER_ID").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "cli".to_string());

    tasks.approve(&id, &actor).await?;
    println!("Approved: {} (by {})", id, actor);
    Ok(())
}

#[derive(Args)]
pub struct RejectArgs {
    /// Task id (partial ok)
    id: String,

    /// Rejection reason
    #[arg(long, default_value = "")]
    reason: String,
}

pub async fn reject(app: &App, args: RejectArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;
    tasks.reject(&id, &args.reason).await?;

    if args.reason.is_empty() {
        println!("Rejected: {}", id);
    } else {
        println!("Rejected: {} ({})", id, args.reason);
    }
    Ok(())
}

#[derive(Args)]
pub struct UnclaimArgs {
    /// Task id (partial ok)
    id: String,
}

pub async fn unclaim(app: &App, args: UnclaimArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let id = tasks.resolve_prefix(&args.id).await?;
    tasks.unclaim(&id).await?;
    println!("Unclaimed: {}", id);
    Ok(())
}

#[derive(Args)]
pub struct ReclaimArgs {
    /// Stale threshold in minutes
    #[arg(long, default_value_t = 30)]
    minutes: i32,
}

pub async fn reclaim(app: &App, args: ReclaimArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    let count = tasks.reclaim_stale(args.minutes).await?;
    if count == 0 {
        println!("No stale tasks to reclaim.");
    } else {
        println!("Reclaimed {} stale task(s).", count);
    }
    Ok(())
}

#[derive(Args)]
pub struct DraftReleaseArgs {
    /// Task id (partial ok)
    id: Option<String>,

    /// Release all draft tasks in the project
    #[arg(long)]
    all: bool,

    /// Project id (required with --all)
    #[arg(long)]
    project: Option<String>,
}

pub async fn draft_release(app: &App, args: DraftReleaseArgs) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());

    if args.all {
        let Some(project) = project_or_env(args.project) else {
            bail!("--project is required with --all");
        };
        let summary = tasks.draft_release_all(&project).await?;
        println!(
            "Released {} draft task(s) in project {} ({} ready, {} pending)",
            summary.total(),
            project,
            summary.to_ready,
            summary.to_pending
        );
        return Ok(());
    }

    let Some(id) = &args.id else {
        bail!("specify a task id or use --all --project <id>");
    };
    let resolved = tasks.resolve_prefix(id).await?;
    let reached = tasks.draft_release(&resolved).await?;
    println!("Released: {} → {}", resolved, reached);
    Ok(())
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: Vec<String>,
}

pub async fn search(app: &App, args: SearchArgs) -> Result<()> {
    let contexts = ContextRepository::new(app.db.pool().clone());
    let results = contexts.search(&args.query.join(" ")).await?;

    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }

    for entry in &results {
        println!(
            "{}  [{}] {}  {}",
            truncate_id(&entry.task_id),
            entry.kind,
            relative_time(entry.created_at),
            entry.content.lines().next().unwrap_or("")
        );
    }
    Ok(())
}
