// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory robot registry with liveness sweeping.

use armada_core::{Capability, JobId, Robot, RobotId, RobotStatus};
use parking_lot::Mutex;
use std::collections::BTreeSet;

/// Robots that failed to heartbeat within this window are marked
/// offline by the health sweep.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 60_000;

/// Registry keyed by robot id. All operations take the single coarse
/// lock; callers get owned snapshots, never references into the map.
#[derive(Default)]
pub struct RobotRegistry {
    robots: Mutex<Vec<Robot>>,
}

impl RobotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a robot record. A re-register of a known id
    /// refreshes spec fields but keeps the in-flight job set.
    pub fn register(&self, robot: Robot) {
        let mut robots = self.robots.lock();
        match robots.iter_mut().find(|r| r.id == robot.id) {
            Some(existing) => {
                let current_job_ids = std::mem::take(&mut existing.current_job_ids);
                *existing = robot;
                existing.current_job_ids.extend(current_job_ids);
            }
            None => robots.push(robot),
        }
    }

    /// Record a heartbeat; refreshes liveness and flips an offline robot
    /// back online.
    pub fn heartbeat(&self, id: &RobotId, now_ms: u64) -> bool {
        let mut robots = self.robots.lock();
        match robots.iter_mut().find(|r| &r.id == id) {
            Some(robot) => {
                robot.last_heartbeat_ms = now_ms;
                if robot.status == RobotStatus::Offline {
                    robot.status = RobotStatus::Online;
                }
                true
            }
            None => false,
        }
    }

    pub fn update_status(&self, id: &RobotId, status: RobotStatus) -> bool {
        let mut robots = self.robots.lock();
        match robots.iter_mut().find(|r| &r.id == id) {
            Some(robot) => {
                robot.status = status;
                true
            }
            None => false,
        }
    }

    pub fn deregister(&self, id: &RobotId) -> Option<Robot> {
        let mut robots = self.robots.lock();
        let idx = robots.iter().position(|r| &r.id == id)?;
        Some(robots.remove(idx))
    }

    pub fn get(&self, id: &RobotId) -> Option<Robot> {
        self.robots.lock().iter().find(|r| &r.id == id).cloned()
    }

    /// All robots in stable id order.
    pub fn list(&self) -> Vec<Robot> {
        let mut robots = self.robots.lock().clone();
        robots.sort_by(|a, b| a.id.cmp(&b.id));
        robots
    }

    pub fn len(&self) -> usize {
        self.robots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.lock().is_empty()
    }

    pub fn find_by_capability(&self, capability: Capability) -> Vec<Robot> {
        let mut robots: Vec<Robot> = self
            .robots
            .lock()
            .iter()
            .filter(|r| r.capabilities.contains(&capability))
            .cloned()
            .collect();
        robots.sort_by(|a, b| a.id.cmp(&b.id));
        robots
    }

    /// Online robots with spare slots carrying every required capability,
    /// in stable id order.
    pub fn available_robots(&self, required: &BTreeSet<Capability>) -> Vec<Robot> {
        let mut robots: Vec<Robot> = self
            .robots
            .lock()
            .iter()
            .filter(|r| r.is_available() && r.has_capabilities(required))
            .cloned()
            .collect();
        robots.sort_by(|a, b| a.id.cmp(&b.id));
        robots
    }

    /// Add a job to a robot's in-flight set.
    pub fn claim_job(&self, id: &RobotId, job: JobId) -> bool {
        let mut robots = self.robots.lock();
        match robots.iter_mut().find(|r| &r.id == id) {
            Some(robot) => robot.current_job_ids.insert(job),
            None => false,
        }
    }

    /// Remove a job from a robot's in-flight set.
    pub fn release_job(&self, id: &RobotId, job: &JobId) -> bool {
        let mut robots = self.robots.lock();
        match robots.iter_mut().find(|r| &r.id == id) {
            Some(robot) => robot.current_job_ids.remove(job),
            None => false,
        }
    }

    /// Mark robots whose heartbeat went stale offline and drain their
    /// in-flight jobs for reassignment.
    ///
    /// Returns `(robot, orphaned jobs)` per newly offline robot. Draining
    /// happens here, under the same lock that flipped the status, so a
    /// racing completion cannot double-account a job.
    pub fn sweep_stale(&self, now_ms: u64, timeout_ms: u64) -> Vec<(RobotId, Vec<JobId>)> {
        let mut swept = Vec::new();
        let mut robots = self.robots.lock();
        for robot in robots.iter_mut() {
            if robot.status == RobotStatus::Maintenance {
                continue;
            }
            if now_ms.saturating_sub(robot.last_heartbeat_ms) < timeout_ms {
                continue;
            }
            // Disconnect may have flipped the status already; jobs still
            // drain here, once the grace window has fully elapsed.
            let transitioned = robot.status != RobotStatus::Offline;
            robot.status = RobotStatus::Offline;
            let orphaned: Vec<JobId> =
                std::mem::take(&mut robot.current_job_ids).into_iter().collect();
            if !transitioned && orphaned.is_empty() {
                continue;
            }
            tracing::warn!(
                robot = %robot.id,
                orphaned = orphaned.len(),
                "robot heartbeat timed out"
            );
            swept.push((robot.id.clone(), orphaned));
        }
        swept
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
