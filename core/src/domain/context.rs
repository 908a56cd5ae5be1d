// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Context log
//!
//! Append-only notes attached to a task. Entries are immutable once written;
//! the canonical read order is ascending creation time. `inherited` entries
//! are snapshots copied from done dependencies at claim time and carry the
//! originating task in `source_task`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: i64,
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub kind: ContextKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_task: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Observation,
    Handoff,
    Result,
    TestFailure,
    Inherited,
}

impl ContextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Observation => "observation",
            ContextKind::Handoff => "handoff",
            ContextKind::Result => "result",
            ContextKind::TestFailure => "test_failure",
            ContextKind::Inherited => "inherited",
        }
    }

    pub fn from_str(s: &str) -> Option<ContextKind> {
        match s {
            "observation" => Some(ContextKind::Observation),
            "handoff" => Some(ContextKind::Handoff),
            "result" => Some(ContextKind::Result),
            "test_failure" => Some(ContextKind::TestFailure),
            "inherited" => Some(ContextKind::Inherited),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for k in [
            ContextKind::Observation,
            ContextKind::Handoff,
            ContextKind::Result,
            ContextKind::TestFailure,
            ContextKind::Inherited,
        ] {
            assert_eq!(ContextKind::from_str(k.as_str()), Some(k));
        }
        assert_eq!(ContextKind::from_str("note"), None);
    }
}
