// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Context log repository: append-only writes, timestamp-ordered reads, and
//! the full-text search path over entry content.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::context::{ContextEntry, ContextKind};
use crate::domain::error::Result;

pub(crate) fn context_from_row(row: &PgRow) -> ContextEntry {
    let kind: String = row.get("kind");
    ContextEntry {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        kind: ContextKind::from_str(&kind).unwrap_or(ContextKind::Observation),
        content: row.get("content"),
        source_task: row.get("source_task"),
        created_at: row.get("created_at"),
    }
}

pub struct ContextRepository {
    pool: PgPool,
}

impl ContextRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a worker observation.
    pub async fn add_observation(
        &self,
        task_id: &str,
        agent_id: &str,
        content: &str,
    ) -> Result<()> {
        self.append(task_id, agent_id, ContextKind::Observation, content)
            .await
    }

    /// Record a handoff note, written before a long operation so the next
    /// attempt knows where the last one left off.
    pub async fn add_handoff(&self, task_id: &str, agent_id: &str, content: &str) -> Result<()> {
        self.append(task_id, agent_id, ContextKind::Handoff, content)
            .await
    }

    async fn append(
        &self,
        task_id: &str,
        agent_id: &str,
        kind: ContextKind,
        content: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO task_context (task_id, agent_id, kind, content) VALUES ($1, $2, $3, $4)",
        )
        .bind(task_id)
        .bind(agent_id)
        .bind(kind.as_str())
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_task(&self, task_id: &str) -> Result<Vec<ContextEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, task_id, agent_id, kind, content, source_task, created_at
            FROM task_context
            WHERE task_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(context_from_row).collect())
    }

    /// Full-text search across all context content, most relevant first.
    pub async fn search(&self, query: &str) -> Result<Vec<ContextEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT tc.id, tc.task_id, tc.agent_id, tc.kind, tc.content,
                   tc.source_task, tc.created_at
            FROM task_context tc
            WHERE to_tsvector('english', tc.content)
                  @@ plainto_tsquery('english', $1)
            ORDER BY ts_rank(to_tsvector('english', tc.content),
                             plainto_tsquery('english', $1)) DESC
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(context_from_row).collect())
    }
}
