// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task entity
//!
//! A task is the unit of work handed to agents. Its lifecycle is driven
//! entirely through guarded UPDATEs in the task repository; this module only
//! defines the shape, the status set, and id minting.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A work unit with lifecycle and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub body: String,
    pub status: TaskStatus,
    pub priority: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub attempt: i32,
    pub max_attempts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub requires_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    Pending,
    PendingApproval,
    Ready,
    Claimed,
    Done,
    Failed,
    Rejected,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Pending => "pending",
            TaskStatus::PendingApproval => "pending_approval",
            TaskStatus::Ready => "ready",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<TaskStatus> {
        match s {
            "draft" => Some(TaskStatus::Draft),
            "pending" => Some(TaskStatus::Pending),
            "pending_approval" => Some(TaskStatus::PendingApproval),
            "ready" => Some(TaskStatus::Ready),
            "claimed" => Some(TaskStatus::Claimed),
            "done" => Some(TaskStatus::Done),
            "failed" => Some(TaskStatus::Failed),
            "rejected" => Some(TaskStatus::Rejected),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Rejected
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SLUG_MAX: usize = 15;
const SUFFIX_LEN: usize = 5;

/// Mint a task id: slugified title truncated to 15 chars, plus a 5-char
/// random hex suffix.
pub fn generate_task_id(title: &str) -> String {
    let mut slug = slugify(title);
    if slug.len() > SLUG_MAX {
        let mut cut = SLUG_MAX;
        while !slug.is_char_boundary(cut) {
            cut -= 1;
        }
        slug.truncate(cut);
    }
    let slug = slug.trim_end_matches('-');
    format!("{}-{}", slug, random_hex(SUFFIX_LEN))
}

/// Lowercase letter/digit runs joined by single dashes, no leading or
/// trailing dash.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_dash = false;
    for c in s.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
            prev_dash = false;
        } else if !prev_dash && !out.is_empty() {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| HEX[rng.random_range(0..HEX.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Fix CI: flaky e2e"), "fix-ci-flaky-e2e");
        assert_eq!(slugify("  --weird__input!! "), "weird-input");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn generated_id_shape() {
        let id = generate_task_id("Refactor the merge queue drainer loop");
        let (slug, suffix) = id.rsplit_once('-').expect("dash-separated");
        assert!(slug.len() <= SLUG_MAX);
        assert!(!slug.ends_with('-'));
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_distinct() {
        let ids: HashSet<String> =
            (0..1000).map(|_| generate_task_id("same title")).collect();
        // 5 hex chars give ~1M combinations; 1000 draws collide rarely and
        // never down to this few distinct values.
        assert!(ids.len() > 990, "got {} distinct ids", ids.len());
    }

    #[test]
    fn status_round_trip() {
        for s in [
            TaskStatus::Draft,
            TaskStatus::Pending,
            TaskStatus::PendingApproval,
            TaskStatus::Ready,
            TaskStatus::Claimed,
            TaskStatus::Done,
            TaskStatus::Failed,
            TaskStatus::Rejected,
        ] {
            assert_eq!(TaskStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(TaskStatus::from_str("bogus"), None);
    }

    proptest! {
        #[test]
        fn slugify_is_idempotent(s in ".*") {
            let once = slugify(&s);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn slug_charset(s in ".*") {
            let slug = slugify(&s);
            prop_assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
        }
    }
}
