// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Schedule engine
//!
//! Instantiates schedule templates into draft task DAGs and drives the
//! periodic due-sweep. Planning (id minting + local ref resolution) is a
//! pure step so a template either instantiates completely or not at all
//! before any row is written.

use chrono::Utc;
use tracing::warn;

use crate::domain::error::{CoordinatorError, Result};
use crate::domain::schedule::{next_cron_run, parse_template, Schedule, TemplateNode};
use crate::domain::task::{generate_task_id, TaskStatus};
use crate::infrastructure::repositories::{NewTask, ScheduleRepository, TaskRepository};

/// A template node with its minted task id and resolved dependency ids.
#[derive(Debug)]
pub struct PlannedTask {
    pub id: String,
    pub node: TemplateNode,
    pub after_ids: Vec<String>,
}

/// Resolve a validated template into concrete tasks. Nodes are planned in
/// order, so each `after` ref binds to an id minted earlier in the list.
pub fn plan_template(nodes: Vec<TemplateNode>) -> Result<Vec<PlannedTask>> {
    let mut bindings: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    let mut planned = Vec::with_capacity(nodes.len());

    for node in nodes {
        let id = generate_task_id(&node.title);
        let mut after_ids = Vec::with_capacity(node.after.len());
        for dep_ref in &node.after {
            let dep_id = bindings.get(dep_ref).ok_or_else(|| {
                CoordinatorError::TemplateInvalid(format!(
                    "unknown ref {:?} in after for {:?}",
                    dep_ref, node.ref_name
                ))
            })?;
            after_ids.push(dep_id.clone());
        }
        bindings.insert(node.ref_name.clone(), id.clone());
        planned.push(PlannedTask {
            id,
            node,
            after_ids,
        });
    }
    Ok(planned)
}

/// Create draft tasks (plus dependency edges) from a stored template.
/// Returns the created task ids in template order.
pub async fn instantiate_template(
    tasks: &TaskRepository,
    template: &serde_json::Value,
    project_id: Option<&str>,
) -> Result<Vec<String>> {
    let nodes = parse_template(template)?;
    let planned = plan_template(nodes)?;

    let mut created = Vec::with_capacity(planned.len());
    for p in &planned {
        let metadata = p
            .node
            .test_cmd
            .as_ref()
            .map(|cmd| serde_json::json!({ "test_cmd": cmd }));

        tasks
            .create(
                &NewTask {
                    id: p.id.clone(),
                    title: p.node.title.clone(),
                    body: p.node.body.clone(),
                    priority: p.node.effective_priority(),
                    project_id: project_id.map(String::from),
                    metadata,
                    requires_approval: p.node.requires_approval,
                    max_attempts: None,
                },
                TaskStatus::Draft,
            )
            .await?;

        for dep_id in &p.after_ids {
            tasks.add_dependency(&p.id, dep_id).await?;
        }
        created.push(p.id.clone());
    }
    Ok(created)
}

/// Outcome of one due schedule during a sweep.
#[derive(Debug)]
pub struct ScheduleRun {
    pub name: String,
    pub created: Vec<String>,
    pub next_run: chrono::DateTime<Utc>,
}

/// One sweep: instantiate every due schedule and advance its run markers.
/// A schedule that fails to instantiate is logged and skipped; the sweep
/// continues.
pub async fn run_due_schedules(
    schedules: &ScheduleRepository,
    tasks: &TaskRepository,
) -> Result<Vec<ScheduleRun>> {
    let mut runs = Vec::new();
    for schedule in schedules.due().await? {
        match run_one(schedules, tasks, &schedule).await {
            Ok(run) => runs.push(run),
            Err(e) => warn!(schedule = %schedule.name, "instantiation failed: {}", e),
        }
    }
    Ok(runs)
}

async fn run_one(
    schedules: &ScheduleRepository,
    tasks: &TaskRepository,
    schedule: &Schedule,
) -> Result<ScheduleRun> {
    let created =
        instantiate_template(tasks, &schedule.template, schedule.project_id.as_deref()).await?;

    let now = Utc::now();
    let next_run = next_cron_run(&schedule.cron, now)?;
    schedules.after_run(&schedule.name, now, next_run).await?;

    Ok(ScheduleRun {
        name: schedule.name.clone(),
        created,
        next_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(ref_name: &str, title: &str, after: &[&str]) -> TemplateNode {
        TemplateNode {
            ref_name: ref_name.to_string(),
            title: title.to_string(),
            body: String::new(),
            priority: 0,
            test_cmd: None,
            requires_approval: false,
            after: after.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn plan_binds_refs_to_minted_ids() {
        let planned = plan_template(vec![
            node("a", "First step", &[]),
            node("b", "Second step", &["a"]),
            node("c", "Third step", &["a", "b"]),
        ])
        .unwrap();

        assert_eq!(planned.len(), 3);
        assert_eq!(planned[1].after_ids, vec![planned[0].id.clone()]);
        assert_eq!(
            planned[2].after_ids,
            vec![planned[0].id.clone(), planned[1].id.clone()]
        );
    }

    #[test]
    fn plan_mints_distinct_ids_for_identical_titles() {
        let planned =
            plan_template(vec![node("a", "same", &[]), node("b", "same", &[])]).unwrap();
        assert_ne!(planned[0].id, planned[1].id);
    }

    #[test]
    fn plan_rejects_unknown_ref() {
        let err = plan_template(vec![node("a", "A", &["ghost"])]).unwrap_err();
        assert!(matches!(err, CoordinatorError::TemplateInvalid(_)));
    }
}
