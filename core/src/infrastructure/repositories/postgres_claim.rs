// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Claim engine
//!
//! One transaction per claim: flip the chosen ready row to claimed with a
//! `FOR UPDATE SKIP LOCKED` inner select, snapshot context from done
//! dependencies into `inherited` entries, and point the agent row at the
//! task. Skip-locked means N racing workers each land on a distinct task
//! without blocking; a contended row simply does not match.

use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Row, Transaction};

use crate::domain::error::{CoordinatorError, Result};
use crate::domain::task::Task;

use super::postgres_task::{task_from_row, TaskRepository, TASK_COLUMNS};

pub struct ClaimEngine {
    pool: PgPool,
}

impl ClaimEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Claim the highest-priority, oldest ready task, optionally filtered by
    /// project. Returns `None` when nothing is claimable.
    pub async fn claim_next(
        &self,
        agent_id: &str,
        project_id: Option<&str>,
    ) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE tasks
            SET    status     = 'claimed',
                   claimed_by = $1,
                   claimed_at = NOW(),
                   attempt    = attempt + 1
            WHERE  id = (
                SELECT id FROM tasks
                WHERE  status = 'ready'
                  AND  ($2::text IS NULL OR project_id = $2)
                  AND  attempt < max_attempts
                ORDER  BY priority DESC, created_at ASC, id ASC
                LIMIT  1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {TASK_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(agent_id)
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let task = task_from_row(&row);

        inherit_context(&mut tx, &task.id, agent_id).await?;
        assign_agent(&mut tx, &task.id, agent_id).await?;

        tx.commit().await?;
        Ok(Some(task))
    }

    /// Claim a specific task by id prefix. Unlike [`claim_next`], a task
    /// that cannot be claimed is an error, with the reason spelled out.
    ///
    /// [`claim_next`]: ClaimEngine::claim_next
    pub async fn claim_by_id(&self, id_or_prefix: &str, agent_id: &str) -> Result<Task> {
        let tasks = TaskRepository::new(self.pool.clone());
        let id = tasks.resolve_prefix(id_or_prefix).await?;

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE tasks
            SET    status     = 'claimed',
                   claimed_by = $1,
                   claimed_at = NOW(),
                   attempt    = attempt + 1
            WHERE  id      = $2
              AND  status  = 'ready'
              AND  attempt < max_attempts
            RETURNING {TASK_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(agent_id)
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.diagnose_claim_failure(&id).await);
        };
        let task = task_from_row(&row);

        inherit_context(&mut tx, &task.id, agent_id).await?;
        assign_agent(&mut tx, &task.id, agent_id).await?;

        tx.commit().await?;
        Ok(task)
    }

    /// Distinguish "not found", "max attempts reached" and "not ready".
    async fn diagnose_claim_failure(&self, id: &str) -> CoordinatorError {
        let probe = sqlx::query("SELECT status, attempt, max_attempts FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match probe {
            Ok(Some(row)) => {
                let status: String = row.get("status");
                let attempt: i32 = row.get("attempt");
                let max_attempts: i32 = row.get("max_attempts");
                if attempt >= max_attempts {
                    CoordinatorError::MaxAttemptsExceeded {
                        id: id.to_string(),
                        attempt,
                        max_attempts,
                    }
                } else {
                    CoordinatorError::PreconditionFailed {
                        id: id.to_string(),
                        expected: "ready",
                        observed: status,
                    }
                }
            }
            Ok(None) => CoordinatorError::not_found("task", id),
            Err(e) => CoordinatorError::Store(e),
        }
    }
}

/// Snapshot context from done dependencies into the just-claimed task.
/// One-shot: later changes to the dependency do not propagate.
async fn inherit_context(
    tx: &mut Transaction<'_, Postgres>,
    task_id: &str,
    agent_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO task_context (task_id, agent_id, kind, content, source_task)
        SELECT $1, $2, 'inherited', tc.content, tc.task_id
        FROM   task_deps td
        JOIN   task_context tc ON tc.task_id = td.depends_on
                              AND tc.kind IN ('result', 'observation',
                                              'handoff', 'test_failure')
        JOIN   tasks dep       ON dep.id = td.depends_on
                              AND dep.status = 'done'
        WHERE  td.task_id = $1
        ORDER  BY tc.task_id, tc.created_at, tc.id
        "#,
    )
    .bind(task_id)
    .bind(agent_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn assign_agent(
    tx: &mut Transaction<'_, Postgres>,
    task_id: &str,
    agent_id: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE agents
        SET    task_id   = $2,
               status    = 'working',
               last_seen = NOW()
        WHERE  id = $1
        "#,
    )
    .bind(agent_id)
    .bind(task_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
