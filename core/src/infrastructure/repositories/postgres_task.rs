// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task repository
//!
//! All task lifecycle transitions run as guarded UPDATEs: the status (and,
//! where it matters, the claim holder) is part of the WHERE clause, and a
//! zero-row result is reported as a precondition failure carrying the state
//! actually observed. Multi-step transitions (done, failure) commit their
//! context entry and agent release in the same transaction.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::context::ContextEntry;
use crate::domain::error::{CoordinatorError, Result};
use crate::domain::task::{Task, TaskStatus};

use super::postgres_context::context_from_row;

pub(crate) const TASK_COLUMNS: &str = "id, title, body, status, priority, claimed_by, claimed_at, \
     done_at, created_at, attempt, max_attempts, project_id, metadata, \
     requires_approval, approved_by, approved_at, rejection_reason";

pub(crate) fn task_from_row(row: &PgRow) -> Task {
    let status: String = row.get("status");
    Task {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Pending),
        priority: row.get("priority"),
        claimed_by: row.get("claimed_by"),
        claimed_at: row.get("claimed_at"),
        done_at: row.get("done_at"),
        created_at: row.get("created_at"),
        attempt: row.get("attempt"),
        max_attempts: row.get("max_attempts"),
        project_id: row.get("project_id"),
        metadata: row.get("metadata"),
        requires_approval: row.get("requires_approval"),
        approved_by: row.get("approved_by"),
        approved_at: row.get("approved_at"),
        rejection_reason: row.get("rejection_reason"),
    }
}

/// Creation parameters for a task row.
pub struct NewTask {
    pub id: String,
    pub title: String,
    pub body: String,
    pub priority: i32,
    pub project_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub requires_approval: bool,
    pub max_attempts: Option<i32>,
}

/// Counts reported by a bulk draft release.
#[derive(Debug, Clone, Copy)]
pub struct DraftReleaseSummary {
    pub to_pending: u64,
    pub to_ready: u64,
}

impl DraftReleaseSummary {
    pub fn total(&self) -> u64 {
        self.to_pending + self.to_ready
    }
}

pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewTask, status: TaskStatus) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, title, body, status, priority, project_id,
                               metadata, requires_approval, max_attempts)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 3))
            "#,
        )
        .bind(&new.id)
        .bind(&new.title)
        .bind(&new.body)
        .bind(status.as_str())
        .bind(new.priority)
        .bind(&new.project_id)
        .bind(&new.metadata)
        .bind(new.requires_approval)
        .bind(new.max_attempts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Map a unique id prefix to the canonical task id.
    pub async fn resolve_prefix(&self, prefix: &str) -> Result<String> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM tasks WHERE id LIKE $1 || '%' LIMIT 2")
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?;
        match ids.as_slice() {
            [] => Err(CoordinatorError::not_found("task matching", prefix)),
            [id] => Ok(id.clone()),
            _ => Err(CoordinatorError::Ambiguous(prefix.to_string())),
        }
    }

    /// Retrieve a task by exact or partial id.
    pub async fn get(&self, id_or_prefix: &str) -> Result<Task> {
        let id = self.resolve_prefix(id_or_prefix).await?;
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("task", &id))?;
        Ok(task_from_row(&row))
    }

    /// Retrieve a task together with its full context log, oldest first.
    pub async fn get_with_context(
        &self,
        id_or_prefix: &str,
    ) -> Result<(Task, Vec<ContextEntry>)> {
        let task = self.get(id_or_prefix).await?;
        let rows = sqlx::query(
            r#"
            SELECT id, task_id, agent_id, kind, content, source_task, created_at
            FROM task_context
            WHERE task_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(&task.id)
        .fetch_all(&self.pool)
        .await?;
        let entries = rows.iter().map(context_from_row).collect();
        Ok((task, entries))
    }

    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE ($1::text IS NULL OR project_id = $1) \
             ORDER BY priority DESC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    /// All dependency edges as (task, depends_on) pairs, for tree projection.
    pub async fn list_dependency_edges(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT task_id, depends_on FROM task_deps")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| (r.get("task_id"), r.get("depends_on")))
            .collect())
    }

    pub async fn update_body(&self, id: &str, title: &str, body: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET title = $2, body = $3 WHERE id = $1")
            .bind(id)
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Creation-time status adjustment. Lifecycle transitions go through the
    /// guarded operations below instead.
    pub async fn set_status(&self, id: &str, status: TaskStatus) -> Result<()> {
        sqlx::query("UPDATE tasks SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn approve(&self, id: &str, approved_by: &str) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET    status      = 'ready',
                   approved_by = $2,
                   approved_at = NOW()
            WHERE  id     = $1
              AND  status = 'pending_approval'
            "#,
        )
        .bind(id)
        .bind(approved_by)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(self.precondition_failure(id, "pending_approval").await);
        }
        Ok(())
    }

    pub async fn reject(&self, id: &str, reason: &str) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET    status           = 'rejected',
                   rejection_reason = $2
            WHERE  id     = $1
              AND  status = 'pending_approval'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(self.precondition_failure(id, "pending_approval").await);
        }
        Ok(())
    }

    /// Release a claimed task back to ready without recording an attempt
    /// outcome.
    pub async fn unclaim(&self, id: &str) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET    status     = 'ready',
                   claimed_by = NULL,
                   claimed_at = NULL
            WHERE  id     = $1
              AND  status = 'claimed'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(self.precondition_failure(id, "claimed").await);
        }
        Ok(())
    }

    /// Promote a single draft (or dep-blocked pending) task: ready when all
    /// deps are done, pending otherwise. Returns the status reached.
    pub async fn draft_release(&self, id: &str) -> Result<TaskStatus> {
        let target = if self.has_unmet_deps(id).await? {
            TaskStatus::Pending
        } else {
            TaskStatus::Ready
        };
        let updated = sqlx::query(
            "UPDATE tasks SET status = $2 WHERE id = $1 AND status IN ('draft', 'pending')",
        )
        .bind(id)
        .bind(target.as_str())
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(self.precondition_failure(id, "draft or pending").await);
        }
        Ok(target)
    }

    /// Promote every draft task in a project. Drafts with unmet deps go to
    /// pending; the rest go to ready.
    pub async fn draft_release_all(&self, project_id: &str) -> Result<DraftReleaseSummary> {
        let mut tx = self.pool.begin().await?;

        let to_pending = sqlx::query(
            r#"
            UPDATE tasks
            SET    status = 'pending'
            WHERE  status     = 'draft'
              AND  project_id = $1
              AND  id IN (
                SELECT td.task_id
                FROM   task_deps td
                JOIN   tasks dep ON dep.id = td.depends_on
                WHERE  dep.status != 'done'
              )
            "#,
        )
        .bind(project_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let to_ready = sqlx::query(
            "UPDATE tasks SET status = 'ready' WHERE status = 'draft' AND project_id = $1",
        )
        .bind(project_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(DraftReleaseSummary {
            to_pending,
            to_ready,
        })
    }

    /// Record a passing outcome: result entry, done transition, agent
    /// release, one transaction. Only the claim holder may complete.
    pub async fn mark_done(&self, task_id: &str, agent_id: &str, summary: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET    status     = 'done',
                   done_at    = NOW(),
                   claimed_by = NULL,
                   claimed_at = NULL
            WHERE  id         = $1
              AND  status     = 'claimed'
              AND  claimed_by = $2
            "#,
        )
        .bind(task_id)
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.precondition_failure(task_id, "claimed").await);
        }

        sqlx::query(
            "INSERT INTO task_context (task_id, agent_id, kind, content) \
             VALUES ($1, $2, 'result', $3)",
        )
        .bind(task_id)
        .bind(agent_id)
        .bind(summary)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE agents SET task_id = NULL, status = 'idle', last_seen = NOW() WHERE id = $1",
        )
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Record a failing outcome: back to ready while attempts remain, failed
    /// once the budget is spent. Returns the status reached.
    pub async fn record_failure(
        &self,
        task_id: &str,
        agent_id: &str,
        output: &str,
    ) -> Result<TaskStatus> {
        let mut tx = self.pool.begin().await?;

        let reset = sqlx::query(
            r#"
            UPDATE tasks
            SET    status     = 'ready',
                   claimed_by = NULL,
                   claimed_at = NULL
            WHERE  id         = $1
              AND  status     = 'claimed'
              AND  claimed_by = $2
              AND  attempt    < max_attempts
            "#,
        )
        .bind(task_id)
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;

        let reached = if reset.rows_affected() > 0 {
            TaskStatus::Ready
        } else {
            let failed = sqlx::query(
                r#"
                UPDATE tasks
                SET    status     = 'failed',
                       claimed_by = NULL,
                       claimed_at = NULL
                WHERE  id         = $1
                  AND  status     = 'claimed'
                  AND  claimed_by = $2
                  AND  attempt    >= max_attempts
                "#,
            )
            .bind(task_id)
            .bind(agent_id)
            .execute(&mut *tx)
            .await?;
            if failed.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(self.precondition_failure(task_id, "claimed").await);
            }
            TaskStatus::Failed
        };

        sqlx::query(
            "INSERT INTO task_context (task_id, agent_id, kind, content) \
             VALUES ($1, $2, 'test_failure', $3)",
        )
        .bind(task_id)
        .bind(agent_id)
        .bind(output)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE agents SET task_id = NULL, status = 'idle', last_seen = NOW() WHERE id = $1",
        )
        .bind(agent_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reached)
    }

    /// Reset tasks claimed longer than the threshold. Returns the count.
    pub async fn reclaim_stale(&self, minutes: i32) -> Result<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET    status     = 'ready',
                   claimed_by = NULL,
                   claimed_at = NULL
            WHERE  status     = 'claimed'
              AND  claimed_at < NOW() - make_interval(mins => $1)
            "#,
        )
        .bind(minutes)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected())
    }

    /// Insert a dependency edge, rejecting any edge that would close a cycle
    /// through the transitive closure.
    pub async fn add_dependency(&self, task_id: &str, depends_on: &str) -> Result<()> {
        let cycle: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE reachable(id) AS (
                SELECT depends_on FROM task_deps WHERE task_id = $2
                UNION
                SELECT td.depends_on
                FROM   task_deps td
                JOIN   reachable r ON td.task_id = r.id
            )
            SELECT $1::text = $2::text
                OR EXISTS (SELECT 1 FROM reachable WHERE id = $1)
            "#,
        )
        .bind(task_id)
        .bind(depends_on)
        .fetch_one(&self.pool)
        .await?;
        if cycle {
            return Err(CoordinatorError::CycleRejected {
                task: task_id.to_string(),
                depends_on: depends_on.to_string(),
            });
        }

        sqlx::query("INSERT INTO task_deps (task_id, depends_on) VALUES ($1, $2)")
            .bind(task_id)
            .bind(depends_on)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// A task has unmet deps iff at least one depends-on target is not done.
    pub async fn has_unmet_deps(&self, task_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM   task_deps td
            JOIN   tasks t ON t.id = td.depends_on
            WHERE  td.task_id = $1 AND t.status != 'done'
            "#,
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Build the guard-failure error from the state currently on disk.
    pub(crate) async fn precondition_failure(
        &self,
        id: &str,
        expected: &'static str,
    ) -> CoordinatorError {
        let probe = sqlx::query("SELECT status, claimed_by FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match probe {
            Ok(Some(row)) => {
                let status: String = row.get("status");
                let claimed_by: Option<String> = row.get("claimed_by");
                let observed = match claimed_by {
                    Some(by) if status == "claimed" => format!("claimed by {}", by),
                    _ => status,
                };
                CoordinatorError::PreconditionFailed {
                    id: id.to_string(),
                    expected,
                    observed,
                }
            }
            Ok(None) => CoordinatorError::not_found("task", id),
            Err(e) => CoordinatorError::Store(e),
        }
    }
}
