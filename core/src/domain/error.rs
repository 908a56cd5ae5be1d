// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error kinds surfaced by the coordination substrate. Guard failures carry
//! the observed state so a worker's one-line diagnostic says what it found,
//! not just what it wanted.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("ambiguous prefix {0:?} matches multiple tasks")]
    Ambiguous(String),

    #[error("task {id:?} is not {expected} (status: {observed})")]
    PreconditionFailed {
        id: String,
        expected: &'static str,
        observed: String,
    },

    #[error("task {id:?} has reached max attempts ({attempt}/{max_attempts})")]
    MaxAttemptsExceeded {
        id: String,
        attempt: i32,
        max_attempts: i32,
    },

    #[error("dependency of {task:?} on {depends_on:?} would create a cycle")]
    CycleRejected { task: String, depends_on: String },

    #[error("invalid template: {0}")]
    TemplateInvalid(String),

    #[error("invalid cron expression {expr:?}: {reason}")]
    ScheduleInvalid { expr: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("external command failed: {0}")]
    External(String),
}

impl CoordinatorError {
    /// Helper for `NotFound` with an entity label, e.g. `task "abc1"`.
    pub fn not_found(entity: &str, key: &str) -> Self {
        CoordinatorError::NotFound(format!("{} {:?}", entity, key))
    }
}
