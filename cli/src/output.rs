// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared terminal rendering helpers: status glyphs, id truncation,
//! relative timestamps.

use capataz_core::domain::agent::AgentStatus;
use capataz_core::domain::task::TaskStatus;
use chrono::{DateTime, Utc};

pub fn status_symbol(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Draft => "◌",
        TaskStatus::Pending => "○",
        TaskStatus::PendingApproval => "⊘",
        TaskStatus::Ready => "◎",
        TaskStatus::Claimed => "●",
        TaskStatus::Done => "✓",
        TaskStatus::Failed => "✗",
        TaskStatus::Rejected => "⊗",
    }
}

pub fn agent_symbol(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "○",
        AgentStatus::Working => "●",
    }
}

pub fn truncate_id(id: &str) -> &str {
    if id.len() <= 20 {
        return id;
    }
    let mut cut = 20;
    while !id.is_char_boundary(cut) {
        cut -= 1;
    }
    &id[..cut]
}

pub fn relative_time(t: DateTime<Utc>) -> String {
    let d = Utc::now().signed_duration_since(t);
    if d.num_minutes() < 1 {
        format!("{}s ago", d.num_seconds().max(0))
    } else if d.num_hours() < 1 {
        format!("{}m ago", d.num_minutes())
    } else {
        format!("{}h ago", d.num_hours())
    }
}

/// "—" for absent optional display values.
pub fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("—")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn truncation_caps_at_twenty() {
        assert_eq!(truncate_id("short-id"), "short-id");
        let long = "a-very-long-task-identifier-aaaaa";
        assert_eq!(truncate_id(long).len(), 20);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Slugs keep any alphanumeric char, so byte 20 can fall inside a
        // multibyte character.
        let cjk = "修复解析器错误处理逻辑-a1b2c";
        let cut = truncate_id(cjk);
        assert!(cut.len() <= 20);
        assert!(cjk.starts_with(cut));
    }

    #[test]
    fn relative_times() {
        let now = Utc::now();
        assert!(relative_time(now - Duration::seconds(10)).ends_with("s ago"));
        assert!(relative_time(now - Duration::minutes(5)).ends_with("m ago"));
        assert!(relative_time(now - Duration::hours(3)).ends_with("h ago"));
    }
}
