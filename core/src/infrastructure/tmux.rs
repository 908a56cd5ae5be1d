// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # tmux wrapper
//!
//! Thin shell-outs to the tmux binary. The coordinator shares the tmux
//! server with whatever else the operator runs, so everything here is
//! optimistic: callers treat failures as warnings where cleanup is involved.

use tokio::process::Command;

use crate::domain::error::{CoordinatorError, Result};

async fn tmux(args: &[&str]) -> Result<String> {
    let output = Command::new("tmux")
        .args(args)
        .output()
        .await
        .map_err(|e| CoordinatorError::External(format!("tmux: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoordinatorError::External(format!(
            "tmux {}: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub async fn session_exists(name: &str) -> bool {
    tmux(&["has-session", "-t", name]).await.is_ok()
}

pub async fn ensure_session(name: &str) -> Result<()> {
    if session_exists(name).await {
        return Ok(());
    }
    tmux(&["new-session", "-d", "-s", name]).await?;
    Ok(())
}

/// Create a window and export the given variables inside it.
pub async fn new_window(
    session: &str,
    window: &str,
    dir: Option<&str>,
    env: &[(String, String)],
) -> Result<()> {
    let mut args = vec!["new-window", "-t", session, "-n", window];
    if let Some(dir) = dir {
        args.push("-c");
        args.push(dir);
    }
    tmux(&args).await?;

    for (k, v) in env {
        send_keys(session, window, &format!("export {}={:?}", k, v)).await?;
    }
    Ok(())
}

pub async fn send_keys(session: &str, window: &str, keys: &str) -> Result<()> {
    let target = format!("{}:{}", session, window);
    tmux(&["send-keys", "-t", &target, keys, "Enter"]).await?;
    Ok(())
}

/// Capture the last N lines of a window's pane.
pub async fn capture_pane(session: &str, window: &str, lines: u32) -> Result<String> {
    let target = format!("{}:{}", session, window);
    let start = format!("-{}", lines);
    let out = tmux(&["capture-pane", "-t", &target, "-p", "-S", &start]).await?;
    Ok(out.trim_end_matches('\n').to_string())
}

pub async fn kill_window(session: &str, window: &str) -> Result<()> {
    let target = format!("{}:{}", session, window);
    tmux(&["kill-window", "-t", &target]).await?;
    Ok(())
}

pub fn inside_tmux() -> bool {
    std::env::var_os("TMUX").is_some()
}

/// Attach to a session, or switch windows when already inside tmux. Attach
/// runs tmux as a foreground child with inherited stdio and waits for it.
pub async fn attach_or_switch(session: &str, window: Option<&str>) -> Result<()> {
    if inside_tmux() {
        let target = match window {
            Some(w) => format!("{}:{}", session, w),
            None => session.to_string(),
        };
        tmux(&["select-window", "-t", &target]).await?;
        return Ok(());
    }

    if let Some(w) = window {
        let target = format!("{}:{}", session, w);
        let _ = tmux(&["select-window", "-t", &target]).await;
    }
    let status = Command::new("tmux")
        .args(["attach-session", "-t", session])
        .status()
        .await
        .map_err(|e| CoordinatorError::External(format!("tmux attach: {}", e)))?;
    if !status.success() {
        return Err(CoordinatorError::External(format!(
            "tmux attach-session -t {} exited with {}",
            session, status
        )));
    }
    Ok(())
}
