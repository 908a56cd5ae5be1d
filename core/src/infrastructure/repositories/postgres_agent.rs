// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent registry repository. Rows are created on spawn and destroyed on
//! kill; removal releases any task the agent still holds, in the same
//! transaction.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{AgentRecord, AgentStatus};
use crate::domain::error::Result;

const AGENT_COLUMNS: &str = "id, tmux_session, tmux_window, task_id, status, started_at, \
     last_seen, worktree_dir, branch";

fn agent_from_row(row: &PgRow) -> AgentRecord {
    let status: String = row.get("status");
    AgentRecord {
        id: row.get("id"),
        tmux_session: row.get("tmux_session"),
        tmux_window: row.get("tmux_window"),
        task_id: row.get("task_id"),
        status: AgentStatus::from_str(&status).unwrap_or(AgentStatus::Idle),
        started_at: row.get("started_at"),
        last_seen: row.get("last_seen"),
        worktree_dir: row.get("worktree_dir"),
        branch: row.get("branch"),
    }
}

pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(
        &self,
        id: &str,
        tmux_session: &str,
        tmux_window: &str,
        worktree_dir: Option<&str>,
        branch: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, tmux_session, tmux_window, last_seen,
                                worktree_dir, branch)
            VALUES ($1, $2, $3, NOW(), $4, $5)
            "#,
        )
        .bind(id)
        .bind(tmux_session)
        .bind(tmux_window)
        .bind(worktree_dir)
        .bind(branch)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<AgentRecord>> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY started_at ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(agent_from_row).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<AgentRecord>> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(agent_from_row))
    }

    /// Heartbeat: bump status and last_seen.
    pub async fn heartbeat(&self, id: &str, status: AgentStatus) -> Result<()> {
        sqlx::query("UPDATE agents SET status = $2, last_seen = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove an agent, releasing any claimed task back to ready.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE tasks
            SET    status     = 'ready',
                   claimed_by = NULL,
                   claimed_at = NULL
            WHERE  claimed_by = $1
              AND  status     = 'claimed'
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
