// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # git wrapper
//!
//! Worktree and merge plumbing, shelled out to the git binary. Merge
//! conflicts are a first-class outcome rather than an error: the drainer
//! records them and moves on.

use tokio::process::Command;

use crate::domain::error::{CoordinatorError, Result};

/// Result of a no-fast-forward merge attempt.
#[derive(Debug)]
pub enum MergeOutcome {
    Merged { sha: String },
    Conflict { files: Vec<String> },
}

async fn git(args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(|e| CoordinatorError::External(format!("git: {}", e)))?;
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoordinatorError::External(format!(
            "git {}: {} {}",
            args.join(" "),
            stdout.trim(),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub async fn repo_root() -> Result<String> {
    let out = git(&["rev-parse", "--show-toplevel"]).await?;
    Ok(out.trim().to_string())
}

pub async fn current_branch() -> Result<String> {
    let out = git(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    Ok(out.trim().to_string())
}

/// True when the working tree differs from HEAD.
pub async fn has_uncommitted_changes() -> Result<bool> {
    let status = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .await
        .map_err(|e| CoordinatorError::External(format!("git diff: {}", e)))?;
    match status.code() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(CoordinatorError::External(format!(
            "git diff --quiet HEAD exited with {}",
            status
        ))),
    }
}

/// Create a worktree at `dir` on a fresh branch.
pub async fn worktree_add(dir: &str, branch: &str) -> Result<()> {
    git(&["worktree", "add", "-b", branch, dir]).await?;
    Ok(())
}

pub async fn worktree_remove(dir: &str) -> Result<()> {
    git(&["worktree", "remove", "--force", dir]).await?;
    Ok(())
}

/// True when `branch` has commits not yet on `base_branch`.
pub async fn has_unmerged_changes(branch: &str, base_branch: &str) -> Result<bool> {
    let range = format!("{}..{}", base_branch, branch);
    let out = git(&["log", "--oneline", &range]).await?;
    Ok(!out.trim().is_empty())
}

/// Stage everything in the worktree and commit. Returns the commit sha, or
/// `None` when there is nothing to commit.
pub async fn add_and_commit(worktree_dir: &str, message: &str) -> Result<Option<String>> {
    git(&["-C", worktree_dir, "add", "-A"]).await?;

    let staged = Command::new("git")
        .args(["-C", worktree_dir, "diff", "--cached", "--quiet"])
        .status()
        .await
        .map_err(|e| CoordinatorError::External(format!("git diff: {}", e)))?;
    if staged.success() {
        return Ok(None);
    }

    git(&["-C", worktree_dir, "commit", "-m", message]).await?;
    let sha = git(&["-C", worktree_dir, "rev-parse", "HEAD"]).await?;
    Ok(Some(sha.trim().to_string()))
}

/// No-fast-forward merge of `branch` into `base_branch`, run from the main
/// checkout. A conflicted merge is left in place for the caller to abort.
pub async fn merge_no_ff(branch: &str, base_branch: &str, message: &str) -> Result<MergeOutcome> {
    git(&["checkout", base_branch]).await?;

    match git(&["merge", "--no-ff", "-m", message, branch]).await {
        Ok(_) => {
            let sha = git(&["rev-parse", "HEAD"]).await?;
            Ok(MergeOutcome::Merged {
                sha: sha.trim().to_string(),
            })
        }
        Err(merge_err) => {
            let files = conflict_files().await.unwrap_or_default();
            if files.is_empty() {
                Err(merge_err)
            } else {
                Ok(MergeOutcome::Conflict { files })
            }
        }
    }
}

pub async fn abort_merge() -> Result<()> {
    git(&["merge", "--abort"]).await?;
    Ok(())
}

async fn conflict_files() -> Result<Vec<String>> {
    let out = git(&["diff", "--name-only", "--diff-filter=U"]).await?;
    Ok(parse_name_list(&out))
}

fn parse_name_list(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_list_splits_lines() {
        assert_eq!(
            parse_name_list("src/queue.rs\nsrc/store.rs\n"),
            vec!["src/queue.rs", "src/store.rs"]
        );
    }

    #[test]
    fn name_list_of_clean_diff_is_empty() {
        assert!(parse_name_list("").is_empty());
        assert!(parse_name_list("\n\n").is_empty());
    }
}
