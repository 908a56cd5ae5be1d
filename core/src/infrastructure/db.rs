// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL connection pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype injected into
//! every repository. One pool per process, constructed on first use, closed
//! at exit. The migration ledger is forward-only: each file under
//! `migrations/` is applied at most once, inside its own transaction, and a
//! failed migration aborts startup.

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::domain::error::Result;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations. Returns the names applied this run.
    pub async fn migrate(&self) -> Result<Vec<String>> {
        let applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;

        Ok(MIGRATOR
            .iter()
            .skip(applied as usize)
            .map(|m| format!("{} {}", m.version, m.description))
            .collect())
    }
}
