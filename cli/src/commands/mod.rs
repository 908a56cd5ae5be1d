//! Command implementations for the capataz CLI.

pub mod agent;
pub mod cron;
pub mod merge;
pub mod planner;
pub mod prompt;
pub mod schedule;
pub mod store;
pub mod task;
pub mod worker;

/// Project filter resolution: explicit flag, then `CAPATAZ_PROJECT`.
pub fn project_or_env(flag: Option<String>) -> Option<String> {
    flag.or_else(|| {
        std::env::var("CAPATAZ_PROJECT")
            .ok()
            .filter(|s| !s.is_empty())
    })
}

/// Base branch the merge queue integrates into.
pub fn base_branch() -> String {
    std::env::var("CAPATAZ_BASE_BRANCH")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "main".to_string())
}
