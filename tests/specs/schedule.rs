// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron firing scenario.

use armada_orchestrator::CronSchedule;
use chrono::{TimeZone, Utc};

#[test]
fn five_minute_cron_fires_on_boundaries() {
    // Schedule */5 * * * * in UTC at t0 = 12:03:10.
    let cron = CronSchedule::parse("*/5 * * * *").unwrap();
    let t0 = Utc.with_ymd_and_hms(2026, 4, 1, 12, 3, 10).single().unwrap();

    let first = cron.next_fire(t0).unwrap();
    assert_eq!(first, Utc.with_ymd_and_hms(2026, 4, 1, 12, 5, 0).single().unwrap());

    // After firing, the next fire from 12:05:01 is 12:10:00.
    let after = Utc.with_ymd_and_hms(2026, 4, 1, 12, 5, 1).single().unwrap();
    let second = cron.next_fire(after).unwrap();
    assert_eq!(second, Utc.with_ymd_and_hms(2026, 4, 1, 12, 10, 0).single().unwrap());

    // Monotonicity: next_fire(t) >= t, and advancing past a fire yields a
    // strictly later one.
    assert!(first > t0);
    assert!(second > first);
}

#[test]
fn schedule_manager_fires_through_callback() {
    use armada_core::{FakeClock, JobId};
    use armada_orchestrator::{ScheduleManager, ScheduleSpec};

    let clock = FakeClock::new();
    clock.set_utc(Utc.with_ymd_and_hms(2026, 4, 1, 12, 3, 10).single().unwrap());
    let manager = ScheduleManager::new(clock.clone());

    let schedule = manager
        .create(ScheduleSpec {
            workflow_id: "wf-report".to_string(),
            frequency: "cron".to_string(),
            cron_expression: Some("*/5 * * * *".to_string()),
            enabled: true,
            ..ScheduleSpec::default()
        })
        .unwrap();
    assert_eq!(
        manager.get(&schedule.id).unwrap().next_run,
        Some(Utc.with_ymd_and_hms(2026, 4, 1, 12, 5, 0).single().unwrap())
    );

    // Nothing fires before the boundary.
    assert!(manager.tick(&mut |_| Some(JobId::new("job-early"))).is_empty());

    // Cross the boundary: the schedule fires once and re-arms.
    clock.set_utc(Utc.with_ymd_and_hms(2026, 4, 1, 12, 5, 1).single().unwrap());
    let fired = manager.tick(&mut |s| {
        assert_eq!(s.workflow_id, "wf-report");
        Some(JobId::new("job-1"))
    });
    assert_eq!(fired.len(), 1);
    assert_eq!(
        manager.get(&schedule.id).unwrap().next_run,
        Some(Utc.with_ymd_and_hms(2026, 4, 1, 12, 10, 0).single().unwrap())
    );
}
