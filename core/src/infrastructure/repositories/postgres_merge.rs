// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Merge queue repository
//!
//! FIFO by enqueue time. Claiming the next entry uses the same skip-locked
//! idiom as the task claim engine, so multiple drainers race safely: entries
//! are started in enqueue order, and each is handed to exactly one drainer.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::error::Result;
use crate::domain::merge::{MergeQueueEntry, MergeStatus};

const MERGE_COLUMNS: &str = "id, task_id, agent_id, branch, worktree_dir, base_branch, status, \
     commit_sha, merge_sha, conflict_files, error_msg, \
     enqueued_at, started_at, completed_at";

fn entry_from_row(row: &PgRow) -> MergeQueueEntry {
    let status: String = row.get("status");
    MergeQueueEntry {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        branch: row.get("branch"),
        worktree_dir: row.get("worktree_dir"),
        base_branch: row.get("base_branch"),
        status: MergeStatus::from_str(&status).unwrap_or(MergeStatus::Pending),
        commit_sha: row.get("commit_sha"),
        merge_sha: row.get("merge_sha"),
        conflict_files: row.get("conflict_files"),
        error_msg: row.get("error_msg"),
        enqueued_at: row.get("enqueued_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
    }
}

pub struct MergeQueueRepository {
    pool: PgPool,
}

impl MergeQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending entry. Returns its queue id.
    pub async fn enqueue(
        &self,
        task_id: &str,
        agent_id: &str,
        branch: &str,
        worktree_dir: &str,
        base_branch: &str,
        commit_sha: Option<&str>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO merge_queue (task_id, agent_id, branch, worktree_dir,
                                     base_branch, commit_sha)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(task_id)
        .bind(agent_id)
        .bind(branch)
        .bind(worktree_dir)
        .bind(base_branch)
        .bind(commit_sha)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Atomically flip the oldest pending entry to merging and return it.
    /// `None` when the queue has no pending work.
    pub async fn claim_next(&self) -> Result<Option<MergeQueueEntry>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE merge_queue
            SET    status     = 'merging',
                   started_at = NOW()
            WHERE  id = (
                SELECT id FROM merge_queue
                WHERE  status = 'pending'
                ORDER  BY enqueued_at ASC
                LIMIT  1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {MERGE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql).fetch_optional(&mut *tx).await?;
        let Some(row) = row else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some(entry_from_row(&row)))
    }

    pub async fn complete(&self, id: i64, merge_sha: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE merge_queue
            SET    status       = 'merged',
                   merge_sha    = $2,
                   completed_at = NOW()
            WHERE  id = $1
            "#,
        )
        .bind(id)
        .bind(merge_sha)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn conflict(&self, id: i64, conflict_files: &[String]) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE merge_queue
            SET    status         = 'conflict',
                   conflict_files = $2,
                   completed_at   = NOW()
            WHERE  id = $1
            "#,
        )
        .bind(id)
        .bind(conflict_files)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, id: i64, error_msg: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE merge_queue
            SET    status       = 'failed',
                   error_msg    = $2,
                   completed_at = NOW()
            WHERE  id = $1
            "#,
        )
        .bind(id)
        .bind(error_msg)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<MergeQueueEntry>> {
        let sql = format!("SELECT {MERGE_COLUMNS} FROM merge_queue ORDER BY enqueued_at ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }
}
