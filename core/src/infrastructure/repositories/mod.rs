// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod postgres_agent;
pub mod postgres_claim;
pub mod postgres_context;
pub mod postgres_merge;
pub mod postgres_planner;
pub mod postgres_schedule;
pub mod postgres_task;

pub use postgres_agent::AgentRepository;
pub use postgres_claim::ClaimEngine;
pub use postgres_context::ContextRepository;
pub use postgres_merge::MergeQueueRepository;
pub use postgres_planner::PlannerRepository;
pub use postgres_schedule::ScheduleRepository;
pub use postgres_task::{DraftReleaseSummary, NewTask, TaskRepository};
