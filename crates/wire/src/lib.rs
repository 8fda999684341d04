// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot channel protocol.
//!
//! Frames are JSON documents `{ "type": ..., "id": ..., "correlation_id"?,
//! ...payload }` flowing over a persistent bidirectional stream between
//! the orchestrator and each robot. Request/response pairs correlate via
//! a client-generated correlation id echoed in the response.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod message;
mod wire;

pub use message::{
    FleetEnvelope, FleetFrame, HeartbeatMetrics, JobAssignment, LogRecord, RobotEnvelope,
    RobotFrame, RobotSpec,
};
pub use wire::{decode, encode, read_frame, write_frame, ProtocolError};

pub use armada_core::id::CorrelationId;
