// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Planner session repository, keyed by topic id.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::error::{CoordinatorError, Result};
use crate::domain::planner::{PlannerSession, PlannerStatus};

const PLANNER_COLUMNS: &str =
    "id, topic_id, project_id, tmux_window, status, started_at, stopped_at, created_at";

fn session_from_row(row: &PgRow) -> PlannerSession {
    let status: String = row.get("status");
    PlannerSession {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        project_id: row.get("project_id"),
        tmux_window: row.get("tmux_window"),
        status: PlannerStatus::from_str(&status).unwrap_or(PlannerStatus::Crashed),
        started_at: row.get("started_at"),
        stopped_at: row.get("stopped_at"),
        created_at: row.get("created_at"),
    }
}

pub struct PlannerRepository {
    pool: PgPool,
}

impl PlannerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or restart the session for a topic.
    pub async fn upsert(
        &self,
        topic_id: i64,
        project_id: Option<&str>,
        tmux_window: &str,
        status: PlannerStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO planner_sessions (topic_id, project_id, tmux_window,
                                          status, started_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (topic_id) DO UPDATE SET
                tmux_window = $3,
                status      = $4,
                started_at  = NOW(),
                stopped_at  = NULL
            "#,
        )
        .bind(topic_id)
        .bind(project_id)
        .bind(tmux_window)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn stop(&self, topic_id: i64) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE planner_sessions
            SET    status     = 'stopped',
                   stopped_at = NOW()
            WHERE  topic_id = $1
              AND  status   IN ('running', 'crashed')
            "#,
        )
        .bind(topic_id)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(CoordinatorError::NotFound(format!(
                "active planner session for topic {}",
                topic_id
            )));
        }
        Ok(())
    }

    /// Re-activate a stopped or crashed session.
    pub async fn reopen(&self, topic_id: i64, tmux_window: &str) -> Result<PlannerSession> {
        let sql = format!(
            r#"
            UPDATE planner_sessions
            SET    status      = 'running',
                   tmux_window = $2,
                   started_at  = NOW(),
                   stopped_at  = NULL
            WHERE  topic_id = $1
              AND  status   IN ('stopped', 'crashed')
            RETURNING {PLANNER_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(topic_id)
            .bind(tmux_window)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                CoordinatorError::NotFound(format!(
                    "stopped planner session for topic {}",
                    topic_id
                ))
            })?;
        Ok(session_from_row(&row))
    }

    pub async fn get(&self, topic_id: i64) -> Result<Option<PlannerSession>> {
        let sql = format!("SELECT {PLANNER_COLUMNS} FROM planner_sessions WHERE topic_id = $1");
        let row = sqlx::query(&sql)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(session_from_row))
    }

    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<PlannerSession>> {
        let sql = format!(
            "SELECT {PLANNER_COLUMNS} FROM planner_sessions \
             WHERE ($1::text IS NULL OR project_id = $1) \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(session_from_row).collect())
    }
}
