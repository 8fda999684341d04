// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[yare::parameterized(
    hourly = { "hourly", 3_600 },
    daily = { "daily", 86_400 },
    weekly = { "weekly", 604_800 },
    monthly = { "monthly", 2_592_000 },
)]
fn shorthand_maps_to_interval(name: &str, secs: u64) {
    assert_eq!(
        Frequency::from_shorthand(name),
        Some(Frequency::Interval { interval_secs: secs })
    );
}

#[test]
fn unknown_shorthand_is_none() {
    assert_eq!(Frequency::from_shorthand("fortnightly"), None);
}

#[test]
fn is_due_requires_enabled_and_elapsed() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().unwrap();
    let mut schedule = Schedule::new(ScheduleId::new("sch-1"), "wf-1", Frequency::Once);

    assert!(!schedule.is_due(now)); // no next_run yet

    schedule.next_run = Some(now - chrono::Duration::seconds(1));
    assert!(schedule.is_due(now));

    schedule.enabled = false;
    assert!(!schedule.is_due(now));

    schedule.enabled = true;
    schedule.next_run = Some(now + chrono::Duration::seconds(1));
    assert!(!schedule.is_due(now));
}

#[test]
fn schedule_serde_round_trip() {
    let mut schedule = Schedule::new(ScheduleId::new("sch-rt"), "wf-9", Frequency::Cron);
    schedule.cron_expression = Some("*/5 * * * *".to_string());
    schedule.next_run = Some(Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 0).single().unwrap());

    let json = serde_json::to_string(&schedule).unwrap();
    let parsed: Schedule = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.id, schedule.id);
    assert_eq!(parsed.cron_expression, schedule.cron_expression);
    assert_eq!(parsed.next_run, schedule.next_run);
    assert_eq!(parsed.timezone, "UTC");
}
