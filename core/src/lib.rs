// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # capataz-core
//!
//! The coordination substrate behind the `capataz` CLI: a durable task state
//! machine, an atomic claim protocol with context inheritance, a
//! dependency-aware readiness model, a conflict-aware merge queue, and a
//! cron-driven schedule instantiator, all sharing one PostgreSQL store.
//!
//! Workers are opaque external processes. The core never executes their
//! code; it assigns tasks, accumulates their notes, and decides state
//! transitions from the outcomes they report.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::error::{CoordinatorError, Result};
pub use infrastructure::Database;
