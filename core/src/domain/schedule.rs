// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Schedules and templates
//!
//! A schedule instantiates a template — an ordered list of task nodes with
//! local dependency refs — into a draft task DAG whenever its cron
//! expression fires. Templates are stored verbatim as JSON and re-validated
//! on every instantiation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::CoordinatorError;

/// A recurring cron-driven schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cron: String,
    pub template: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One node of a schedule template. `after` refers to other nodes of the
/// same template by their `ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_cmd: Option<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub after: Vec<String>,
}

impl TemplateNode {
    /// Priority 0 is treated as "unset" and coerced to the default of 5.
    pub fn effective_priority(&self) -> i32 {
        if self.priority == 0 {
            5
        } else {
            self.priority
        }
    }
}

/// Parse a template out of its stored JSON form.
pub fn parse_template(template: &serde_json::Value) -> Result<Vec<TemplateNode>, CoordinatorError> {
    let nodes: Vec<TemplateNode> = serde_json::from_value(template.clone())
        .map_err(|e| CoordinatorError::TemplateInvalid(e.to_string()))?;
    validate_template(&nodes)?;
    Ok(nodes)
}

/// Instantiation iterates nodes in order, so every `after` ref must name an
/// earlier node. Duplicate refs would make bindings ambiguous.
pub fn validate_template(nodes: &[TemplateNode]) -> Result<(), CoordinatorError> {
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for node in nodes {
        if node.ref_name.is_empty() {
            return Err(CoordinatorError::TemplateInvalid(format!(
                "node {:?} has no ref",
                node.title
            )));
        }
        for dep in &node.after {
            if !seen.contains(dep.as_str()) {
                return Err(CoordinatorError::TemplateInvalid(format!(
                    "unknown ref {:?} in after for {:?}",
                    dep, node.ref_name
                )));
            }
        }
        if !seen.insert(node.ref_name.as_str()) {
            return Err(CoordinatorError::TemplateInvalid(format!(
                "duplicate ref {:?}",
                node.ref_name
            )));
        }
    }
    Ok(())
}

/// Validate a 5-field cron expression and compute the next fire time.
pub fn next_cron_run(
    expr: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, CoordinatorError> {
    let cron: croner::Cron =
        croner::Cron::new(expr)
            .parse()
            .map_err(|e: croner::errors::CronError| CoordinatorError::ScheduleInvalid {
                expr: expr.to_string(),
                reason: e.to_string(),
            })?;
    cron.find_next_occurrence(&after, false)
        .map_err(|e| CoordinatorError::ScheduleInvalid {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn template_json() -> serde_json::Value {
        serde_json::json!([
            {"ref": "lint", "title": "Run lint pass", "priority": 3},
            {"ref": "fix", "title": "Fix lint findings", "body": "apply autofixes",
             "test_cmd": "make check", "after": ["lint"]},
            {"ref": "report", "title": "Summarize", "requires_approval": true,
             "after": ["lint", "fix"]}
        ])
    }

    #[test]
    fn template_round_trips() {
        let nodes = parse_template(&template_json()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].ref_name, "fix");
        assert_eq!(nodes[1].after, vec!["lint"]);
        assert_eq!(nodes[1].test_cmd.as_deref(), Some("make check"));
        assert!(nodes[2].requires_approval);

        let encoded = serde_json::to_value(&nodes).unwrap();
        let decoded: Vec<TemplateNode> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, nodes);
    }

    #[test]
    fn unset_priority_coerces_to_default() {
        let nodes = parse_template(&template_json()).unwrap();
        assert_eq!(nodes[0].effective_priority(), 3);
        assert_eq!(nodes[1].effective_priority(), 5);
    }

    #[test]
    fn unknown_ref_rejected() {
        let bad = serde_json::json!([
            {"ref": "a", "title": "A", "after": ["missing"]}
        ]);
        let err = parse_template(&bad).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn forward_ref_rejected() {
        // Refs must point at earlier nodes; instantiation is single-pass.
        let bad = serde_json::json!([
            {"ref": "a", "title": "A", "after": ["b"]},
            {"ref": "b", "title": "B"}
        ]);
        assert!(parse_template(&bad).is_err());
    }

    #[test]
    fn duplicate_ref_rejected() {
        let bad = serde_json::json!([
            {"ref": "a", "title": "A"},
            {"ref": "a", "title": "A again"}
        ]);
        assert!(parse_template(&bad).is_err());
    }

    #[test]
    fn every_minute_advances_by_one_minute() {
        let t = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 30).unwrap();
        let next = next_cron_run("* * * * *", t).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 14, 9, 27, 0).unwrap());
        let after_next = next_cron_run("* * * * *", next).unwrap();
        assert_eq!(
            after_next,
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 28, 0).unwrap()
        );
    }

    #[test]
    fn bad_cron_rejected() {
        assert!(next_cron_run("not a cron", Utc::now()).is_err());
        assert!(next_cron_run("61 * * * *", Utc::now()).is_err());
    }
}
