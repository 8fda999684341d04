// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Robot selection: deterministic matching of work to robots.
//!
//! Stateless — every function operates on the data handed to it, so the
//! same inputs always select the same robot.

use armada_core::{Capability, NodeId, Robot, RobotId};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no available robot satisfies the requirements")]
    NoAvailableRobot,
    #[error("robot {0} not found")]
    RobotNotFound(RobotId),
}

/// Workflow-level assignment: this workflow prefers that robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotAssignment {
    pub workflow_id: String,
    pub robot_id: RobotId,
    /// Higher wins when several assignments name the same workflow.
    pub priority: i32,
    pub is_default: bool,
}

impl RobotAssignment {
    pub fn new(workflow_id: impl Into<String>, robot_id: impl Into<RobotId>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            robot_id: robot_id.into(),
            priority: 0,
            is_default: false,
        }
    }
}

/// Node-level override: one node pinned to a robot or to capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeOverride {
    pub node_id: Option<NodeId>,
    pub robot_id: Option<RobotId>,
    pub required_capabilities: BTreeSet<Capability>,
}

/// Diagnostic score for one robot. Does not affect selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotScore {
    pub robot_id: RobotId,
    pub score: f64,
    pub available: bool,
}

const AVAILABILITY_BASE: f64 = 10.0;
const ASSIGNMENT_BONUS: f64 = 50.0;
const CAPABILITY_BONUS: f64 = 5.0;
const UTILIZATION_WEIGHT: f64 = 10.0;

fn capable(robot: &Robot, required: &BTreeSet<Capability>) -> bool {
    robot.has_capabilities(required)
}

/// Auto-selection: least-utilized available robot carrying the required
/// capabilities; ties break on stable robot id order.
fn auto_select(robots: &[Robot], required: &BTreeSet<Capability>) -> Result<RobotId, MatchError> {
    let mut candidates: Vec<&Robot> = robots
        .iter()
        .filter(|r| r.is_available() && capable(r, required))
        .collect();
    if candidates.is_empty() {
        return Err(MatchError::NoAvailableRobot);
    }
    candidates.sort_by(|a, b| {
        a.utilization()
            .partial_cmp(&b.utilization())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(candidates[0].id.clone())
}

/// Select a robot for a workflow.
///
/// Order: the highest-priority matching assignment whose robot is
/// available (is_default wins ties), then auto-selection over the
/// remaining candidates.
pub fn select_robot_for_workflow(
    workflow_id: &str,
    robots: &[Robot],
    assignments: &[RobotAssignment],
    required: &BTreeSet<Capability>,
) -> Result<RobotId, MatchError> {
    let mut matching: Vec<&RobotAssignment> = assignments
        .iter()
        .filter(|a| a.workflow_id == workflow_id)
        .collect();
    matching.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.is_default.cmp(&a.is_default))
            .then_with(|| a.robot_id.cmp(&b.robot_id))
    });

    for assignment in matching {
        if let Some(robot) = robots.iter().find(|r| r.id == assignment.robot_id) {
            if robot.is_available() && capable(robot, required) {
                return Ok(robot.id.clone());
            }
        }
    }

    auto_select(robots, required)
}

/// Select a robot for a single node, honoring its override first.
///
/// An override naming a robot uses it when available and capable; an
/// override carrying only capabilities narrows the candidate set; with
/// no override the workflow-level rule applies.
pub fn select_robot_for_node(
    workflow_id: &str,
    node_override: Option<&NodeOverride>,
    robots: &[Robot],
    assignments: &[RobotAssignment],
    required: &BTreeSet<Capability>,
) -> Result<RobotId, MatchError> {
    let Some(rule) = node_override else {
        return select_robot_for_workflow(workflow_id, robots, assignments, required);
    };

    let mut needed = required.clone();
    needed.extend(rule.required_capabilities.iter().copied());

    if let Some(robot_id) = &rule.robot_id {
        let robot = robots
            .iter()
            .find(|r| &r.id == robot_id)
            .ok_or_else(|| MatchError::RobotNotFound(robot_id.clone()))?;
        if robot.is_available() && capable(robot, &needed) {
            return Ok(robot.id.clone());
        }
        // Pinned robot unusable: fall back to the general rule under the
        // widened capability set.
    }

    select_robot_for_workflow(workflow_id, robots, assignments, &needed)
}

/// Diagnostic scoring:
/// `availability + assignment bonus + capability bonus + (1 - utilization) * weight`.
pub fn score_robots(
    workflow_id: &str,
    robots: &[Robot],
    assignments: &[RobotAssignment],
    required: &BTreeSet<Capability>,
) -> Vec<RobotScore> {
    let mut scores: Vec<RobotScore> = robots
        .iter()
        .map(|robot| {
            let mut score = 0.0;
            let available = robot.is_available();
            if available {
                score += AVAILABILITY_BASE;
            }
            if assignments
                .iter()
                .any(|a| a.workflow_id == workflow_id && a.robot_id == robot.id)
            {
                score += ASSIGNMENT_BONUS;
            }
            if !required.is_empty() && capable(robot, required) {
                score += CAPABILITY_BONUS;
            }
            score += (1.0 - robot.utilization()) * UTILIZATION_WEIGHT;
            RobotScore { robot_id: robot.id.clone(), score, available }
        })
        .collect();
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.robot_id.cmp(&b.robot_id))
    });
    scores
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
