// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Self-contained prompt generation for workers: a single-task briefing, a
//! claim-until-empty loop, or an ordered batch.

use anyhow::{bail, Context, Result};
use clap::Subcommand;

use capataz_core::domain::context::ContextEntry;
use capataz_core::domain::task::Task;
use capataz_core::infrastructure::repositories::TaskRepository;

use crate::App;

use super::project_or_env;

#[derive(Subcommand)]
pub enum PromptCommand {
    /// Output a single-task prompt
    Single {
        /// Task id (partial ok)
        id: String,
    },
    /// Output a loop prompt for auto mode
    Auto {
        /// Project to claim from (required)
        #[arg(long)]
        project: Option<String>,
    },
    /// Output a multi-task batch prompt
    Batch {
        /// Task ids (partial ok)
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub async fn handle(app: &App, command: PromptCommand) -> Result<()> {
    let tasks = TaskRepository::new(app.db.pool().clone());
    match command {
        PromptCommand::Single { id } => {
            let (task, context) = tasks.get_with_context(&id).await?;
            println!("{}", build_single_prompt(&task, &context));
        }
        PromptCommand::Auto { project } => {
            let Some(project) = project_or_env(project) else {
                bail!("--project is required for auto mode");
            };
            println!("{}", build_auto_prompt(&project));
        }
        PromptCommand::Batch { ids } => {
            let mut entries = Vec::with_capacity(ids.len());
            for id in &ids {
                let pair = tasks
                    .get_with_context(id)
                    .await
                    .with_context(|| format!("loading task {:?}", id))?;
                entries.push(pair);
            }
            println!("{}", build_batch_prompt(&entries));
        }
    }
    Ok(())
}

fn env_section() -> &'static str {
    "## Environment\n\n\
     Your environment is already configured:\n\
     - `AGENT_ID` — your unique agent identifier\n\
     - `DATABASE_URL` — the PostgreSQL connection string\n\
     - the `capataz` binary is on PATH (claim, pick, observe, handoff, done, fail)\n"
}

fn write_context(out: &mut String, context: &[ContextEntry]) {
    if context.is_empty() {
        return;
    }
    out.push_str("## Context\n\n");
    for c in context {
        let agent = c.agent_id.as_deref().unwrap_or("unknown");
        let mut header = format!("### {} (agent: {})", c.kind.as_str().to_uppercase(), agent);
        if let Some(source) = &c.source_task {
            header.push_str(&format!(" from: {}", source));
        }
        out.push_str(&header);
        out.push_str("\n\n");
        out.push_str(&c.content);
        out.push_str("\n\n");
    }
}

pub fn build_single_prompt(task: &Task, context: &[ContextEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Task: {}\n\n", task.title));
    out.push_str(&format!("**ID:** `{}`\n", task.id));
    out.push_str(&format!("**Priority:** {}\n\n", task.priority));

    if !task.body.is_empty() {
        out.push_str("## Specification\n\n");
        out.push_str(&task.body);
        out.push_str("\n\n");
    }

    write_context(&mut out, context);

    out.push_str("## Instructions\n\n");
    out.push_str(&format!("1. Claim this task: `capataz pick {}`\n", task.id));
    out.push_str("2. Read the context above (inherited findings, handoffs, test failures).\n");
    out.push_str(&format!(
        "3. Work on the task. Use `capataz observe {} \"<note>\"` to record findings.\n",
        task.id
    ));
    out.push_str(&format!(
        "4. Use `capataz handoff {} \"<note>\"` before long operations.\n",
        task.id
    ));
    out.push_str(&format!(
        "5. When done: `capataz done {} \"<summary>\"`\n",
        task.id
    ));
    out.push_str(
        "\n**CRITICAL:** You MUST call `capataz done` to mark the task complete. Without it, \
         the task stays claimed and blocks the pipeline. Do NOT use any other mechanism to \
         track completion.\n",
    );
    out.push_str("\n**Rule:** Do NOT loop. Complete this single task and return to interactive mode.\n\n");
    out.push_str(env_section());
    out
}

pub fn build_auto_prompt(project: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Auto Mode — Project: {}\n\n", project));
    out.push_str(&format!(
        "Work through the task queue for project `{}` until it is empty.\n\n",
        project
    ));

    out.push_str("## Loop\n\n");
    out.push_str("Repeat the following:\n\n");
    out.push_str(&format!(
        "1. **Claim**: Run `capataz claim --project {}`\n",
        project
    ));
    out.push_str("   - If output is empty: the queue is empty. **Stop and return to interactive mode.**\n");
    out.push_str("   - If JSON is returned: this is your task spec + context.\n\n");
    out.push_str("2. **Read context** from the JSON:\n");
    out.push_str("   - `task.body`: your complete specification\n");
    out.push_str("   - `context[].kind == \"inherited\"`: findings from dependency tasks\n");
    out.push_str("   - `context[].kind == \"handoff\"`: where a previous attempt left off\n");
    out.push_str("   - `context[].kind == \"test_failure\"`: what broke last time — fix exactly this\n\n");
    out.push_str("3. **Work** on the task. Record observations with `capataz observe <id> \"<note>\"`.\n\n");
    out.push_str("4. **Handoff** before long operations: `capataz handoff <id> \"<note>\"`.\n\n");
    out.push_str("5. **Submit**: `capataz done <id> \"<summary>\"` if tests pass, \
                  `capataz fail <id> \"<output>\"` if they do not. Loop back to step 1.\n\n");

    out.push_str("## Rules\n\n");
    out.push_str("- Never mark a task done without running its tests first.\n");
    out.push_str("- If you see a `test_failure` context entry: fix only what broke.\n");
    out.push_str("- One task per loop iteration.\n");
    out.push_str("- Stop when `capataz claim` returns no output.\n\n");
    out.push_str(env_section());
    out
}

pub fn build_batch_prompt(entries: &[(Task, Vec<ContextEntry>)]) -> String {
    let mut out = String::new();
    out.push_str("# Batch Mode\n\n");
    out.push_str(&format!(
        "Complete the following {} task(s) in order.\n\n",
        entries.len()
    ));

    for (i, (task, context)) in entries.iter().enumerate() {
        out.push_str(&format!("---\n\n## Task {}: {}\n\n", i + 1, task.title));
        out.push_str(&format!("**ID:** `{}`\n", task.id));
        out.push_str(&format!("**Priority:** {}\n\n", task.priority));

        if !task.body.is_empty() {
            out.push_str("### Specification\n\n");
            out.push_str(&task.body);
            out.push_str("\n\n");
        }

        if !context.is_empty() {
            out.push_str("### Context\n\n");
            for c in context {
                let agent = c.agent_id.as_deref().unwrap_or("unknown");
                out.push_str(&format!(
                    "**{}** (agent: {})\n",
                    c.kind.as_str().to_uppercase(),
                    agent
                ));
                out.push_str(&c.content);
                out.push_str("\n\n");
            }
        }

        out.push_str("### Steps\n\n");
        out.push_str(&format!("1. `capataz pick {}`\n", task.id));
        out.push_str("2. Work on the task. Use `capataz observe` for findings.\n");
        out.push_str(&format!("3. `capataz done {} \"<summary>\"`\n\n", task.id));
    }

    out.push_str("---\n\n");
    out.push_str(
        "**CRITICAL:** You MUST call `capataz done` for each task to mark it complete. \
         Without it, tasks stay claimed and block the pipeline.\n\n",
    );
    out.push_str("**After completing all tasks, return to interactive mode.**\n\n");
    out.push_str(env_section());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use capataz_core::domain::context::ContextKind;
    use capataz_core::domain::task::TaskStatus;
    use chrono::Utc;

    fn task(id: &str, title: &str, body: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            status: TaskStatus::Ready,
            priority: 5,
            claimed_by: None,
            claimed_at: None,
            done_at: None,
            created_at: Utc::now(),
            attempt: 0,
            max_attempts: 3,
            project_id: None,
            metadata: None,
            requires_approval: false,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        }
    }

    fn entry(kind: ContextKind, content: &str, source: Option<&str>) -> ContextEntry {
        ContextEntry {
            id: 1,
            task_id: "t".to_string(),
            agent_id: Some("w1".to_string()),
            kind,
            content: content.to_string(),
            source_task: source.map(String::from),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn single_prompt_names_the_task_and_commands() {
        let t = task("fix-parser-a1b2c", "Fix parser", "Handle empty input");
        let ctx = vec![entry(ContextKind::Inherited, "found bug", Some("dep-1"))];
        let prompt = build_single_prompt(&t, &ctx);

        assert!(prompt.contains("# Task: Fix parser"));
        assert!(prompt.contains("`fix-parser-a1b2c`"));
        assert!(prompt.contains("## Specification"));
        assert!(prompt.contains("capataz pick fix-parser-a1b2c"));
        assert!(prompt.contains("INHERITED (agent: w1) from: dep-1"));
        assert!(prompt.contains("found bug"));
    }

    #[test]
    fn auto_prompt_is_project_scoped() {
        let prompt = build_auto_prompt("svc");
        assert!(prompt.contains("capataz claim --project svc"));
        assert!(prompt.contains("Stop when `capataz claim` returns no output."));
    }

    #[test]
    fn batch_prompt_orders_tasks() {
        let entries = vec![
            (task("a-11111", "First", ""), vec![]),
            (task("b-22222", "Second", ""), vec![]),
        ];
        let prompt = build_batch_prompt(&entries);
        let first = prompt.find("## Task 1: First").unwrap();
        let second = prompt.find("## Task 2: Second").unwrap();
        assert!(first < second);
        assert!(prompt.contains("capataz pick a-11111"));
        assert!(prompt.contains("capataz pick b-22222"));
    }

    #[test]
    fn empty_context_omits_section() {
        let t = task("x-00000", "X", "");
        let prompt = build_single_prompt(&t, &[]);
        assert!(!prompt.contains("## Context"));
    }
}
