// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A planner session: an interactive planning window keyed by topic id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerSession {
    pub id: Uuid,
    pub topic_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmux_window: Option<String>,
    pub status: PlannerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerStatus {
    Running,
    Stopped,
    Crashed,
}

impl PlannerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerStatus::Running => "running",
            PlannerStatus::Stopped => "stopped",
            PlannerStatus::Crashed => "crashed",
        }
    }

    pub fn from_str(s: &str) -> Option<PlannerStatus> {
        match s {
            "running" => Some(PlannerStatus::Running),
            "stopped" => Some(PlannerStatus::Stopped),
            "crashed" => Some(PlannerStatus::Crashed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
