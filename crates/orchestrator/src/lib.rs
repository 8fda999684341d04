// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! armada-orchestrator: fleet controller
//!
//! Accepts jobs, matches them to capable robots, dispatches over the
//! robot channel, tracks progress through heartbeats, reassigns on
//! failure, and fires schedules.

pub mod activity;
pub mod api;
pub mod auth;
pub mod channel;
pub mod cron;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod matcher;
pub mod registry;
pub mod schedule;

pub use api::{FleetMetrics, Orchestrator, OrchestratorConfig};
pub use auth::{ApiKeyRecord, AuthConfig};
pub use channel::{ChannelConfig, ChannelServer, ConnectionManager};
pub use cron::CronSchedule;
pub use dispatcher::{AssignReply, DispatchConfig, Dispatcher, RobotLink};
pub use error::OrchestratorError;
pub use events::FleetEvents;
pub use matcher::{
    score_robots, select_robot_for_node, select_robot_for_workflow, MatchError, NodeOverride,
    RobotAssignment, RobotScore,
};
pub use registry::RobotRegistry;
pub use schedule::{ScheduleManager, ScheduleSpec};
