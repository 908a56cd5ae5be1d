// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Merge drainer
//!
//! Claims the oldest pending queue entry and runs the actual integration.
//! Conflicts and tool failures are recorded on the entry and never abort the
//! drain; the conflicting task additionally gets an observation so the next
//! worker attempt sees what happened.

use anyhow::Result;
use tracing::warn;

use crate::domain::merge::MergeQueueEntry;
use crate::infrastructure::git::{self, MergeOutcome};
use crate::infrastructure::repositories::{ContextRepository, MergeQueueRepository};
use crate::infrastructure::Database;

const DRAINER_AGENT: &str = "merge-queue";

#[derive(Debug)]
pub enum DrainOutcome {
    Merged { sha: String },
    Conflict { files: Vec<String> },
    Failed { error: String },
}

#[derive(Debug)]
pub struct ProcessedMerge {
    pub entry: MergeQueueEntry,
    pub outcome: DrainOutcome,
}

/// Process at most one queue entry. `Ok(None)` means the queue had no
/// pending work.
pub async fn drain_one(db: &Database) -> Result<Option<ProcessedMerge>> {
    let merges = MergeQueueRepository::new(db.pool().clone());
    let contexts = ContextRepository::new(db.pool().clone());

    let Some(entry) = merges.claim_next().await? else {
        return Ok(None);
    };

    let message = format!("Merge {}: task {}", entry.branch, entry.task_id);
    let outcome = match git::merge_no_ff(&entry.branch, &entry.base_branch, &message).await {
        Ok(MergeOutcome::Merged { sha }) => {
            merges.complete(entry.id, &sha).await?;
            if let Err(e) = git::worktree_remove(&entry.worktree_dir).await {
                warn!(
                    entry = entry.id,
                    "could not remove worktree {}: {}", entry.worktree_dir, e
                );
            }
            DrainOutcome::Merged { sha }
        }
        Ok(MergeOutcome::Conflict { files }) => {
            if let Err(e) = git::abort_merge().await {
                warn!(entry = entry.id, "merge --abort failed: {}", e);
            }
            merges.conflict(entry.id, &files).await?;
            contexts
                .add_observation(
                    &entry.task_id,
                    DRAINER_AGENT,
                    &format!(
                        "Merge conflict on branch {}: conflict in {} file(s): {}",
                        entry.branch,
                        files.len(),
                        files.join(", ")
                    ),
                )
                .await?;
            DrainOutcome::Conflict { files }
        }
        Err(e) => {
            let error = e.to_string();
            merges.fail(entry.id, &error).await?;
            DrainOutcome::Failed { error }
        }
    };

    Ok(Some(ProcessedMerge { entry, outcome }))
}
