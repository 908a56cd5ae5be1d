//! Schedule repository. Templates are stored as JSONB verbatim; cron
//! validation and next-run computation happen above this layer.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::error::{CoordinatorError, Result};
use crate::domain::schedule::Schedule;

const SCHEDULE_COLUMNS: &str =
    "id, name, description, cron, template, project_id, enabled, last_run, next_run, created_at";

fn schedule_from_row(row: &PgRow) -> Schedule {
    Schedule {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        cron: row.get("cron"),
        template: row.get("template"),
        project_id: row.get("project_id"),
        enabled: row.get("enabled"),
        last_run: row.get("last_run"),
        next_run: row.get("next_run"),
        created_at: row.get("created_at"),
    }
}

pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        cron: &str,
        template: &serde_json::Value,
        project_id: Option<&str>,
        description: Option<&str>,
        next_run: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules (name, cron, template, project_id,
                                   description, next_run)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(name)
        .bind(cron)
        .bind(template)
        .bind(project_id)
        .bind(description)
        .bind(next_run)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self, project_id: Option<&str>) -> Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules \
             WHERE ($1::text IS NULL OR project_id = $1) \
             ORDER BY name"
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(schedule_from_row).collect())
    }

    pub async fn get(&self, name: &str) -> Result<Schedule> {
        let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE name = $1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoordinatorError::not_found("schedule", name))?;
        Ok(schedule_from_row(&row))
    }

    /// Toggle the enabled flag; enabling passes a freshly computed next_run.
    pub async fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE schedules SET enabled = $2, next_run = COALESCE($3, next_run) WHERE name = $1",
        )
        .bind(name)
        .bind(enabled)
        .bind(next_run)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(CoordinatorError::not_found("schedule", name));
        }
        Ok(())
    }

    /// Enabled schedules whose next_run is at or before now.
    pub async fn due(&self) -> Result<Vec<Schedule>> {
        let sql = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules \
             WHERE enabled = TRUE AND next_run <= NOW() \
             ORDER BY next_run ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(schedule_from_row).collect())
    }

    /// Advance the run markers after a successful instantiation.
    pub async fn after_run(
        &self,
        name: &str,
        last_run: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE schedules SET last_run = $2, next_run = $3 WHERE name = $1")
            .bind(name)
            .bind(last_run)
            .bind(next_run)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
