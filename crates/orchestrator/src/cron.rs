// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression parsing and next-fire computation.
//!
//! Five-field grammar (`minute hour day-of-month month day-of-week`) with
//! an optional sixth leading `seconds` field. Field tokens: `*`, `N`,
//! `a-b`, `*/n`, `a-b/n`, and comma lists; month and day-of-week names
//! are accepted. All arithmetic is over UTC instants.

use crate::error::OrchestratorError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DOW_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Search bound: an expression with no occurrence within ~5 years is
/// treated as unsatisfiable (e.g. `0 0 30 2 *`).
const MAX_SEARCH_STEPS: usize = 100_000;

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    seconds: Vec<u32>,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
    has_seconds: bool,
}

impl CronSchedule {
    /// Parse a 5- or 6-field expression.
    pub fn parse(expr: &str) -> Result<CronSchedule, OrchestratorError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let (sec_field, rest) = match fields.len() {
            5 => (None, &fields[..]),
            6 => (Some(fields[0]), &fields[1..]),
            n => {
                return Err(OrchestratorError::InvalidCron(format!(
                    "expected 5 or 6 fields, got {n}"
                )))
            }
        };

        let (seconds, _) = match sec_field {
            Some(f) => parse_field(f, 0, 59, None)?,
            None => (vec![0], false),
        };
        let (minutes, _) = parse_field(rest[0], 0, 59, None)?;
        let (hours, _) = parse_field(rest[1], 0, 23, None)?;
        let (days_of_month, dom_restricted) = parse_field(rest[2], 1, 31, None)?;
        let (months, _) = parse_field(rest[3], 1, 12, Some(&MONTH_NAMES))?;
        let (mut days_of_week, dow_restricted) = parse_field(rest[4], 0, 7, Some(&DOW_NAMES))?;

        // 7 is an alias for Sunday.
        for dow in days_of_week.iter_mut() {
            if *dow == 7 {
                *dow = 0;
            }
        }
        days_of_week.sort_unstable();
        days_of_week.dedup();

        Ok(CronSchedule {
            seconds,
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted,
            dow_restricted,
            has_seconds: sec_field.is_some(),
        })
    }

    /// First instant strictly after the start of `after`'s current unit
    /// that matches the expression. `None` when unsatisfiable.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = if self.has_seconds {
            truncate_to_second(after) + Duration::seconds(1)
        } else {
            truncate_to_minute(after) + Duration::minutes(1)
        };

        for _ in 0..MAX_SEARCH_STEPS {
            if !self.months.contains(&candidate.month()) {
                candidate = start_of_next_month(candidate)?;
                continue;
            }
            if !self.day_matches(candidate) {
                candidate = start_of_next_day(candidate)?;
                continue;
            }
            match next_in(&self.hours, candidate.hour()) {
                None => {
                    candidate = start_of_next_day(candidate)?;
                    continue;
                }
                Some(h) if h > candidate.hour() => {
                    return with_time(candidate, h, self.minutes[0], self.seconds[0]);
                }
                Some(_) => {}
            }
            match next_in(&self.minutes, candidate.minute()) {
                None => {
                    candidate = with_time(candidate, candidate.hour(), 0, 0)?
                        + Duration::hours(1);
                    continue;
                }
                Some(m) if m > candidate.minute() => {
                    return with_time(candidate, candidate.hour(), m, self.seconds[0]);
                }
                Some(_) => {}
            }
            if self.has_seconds {
                match next_in(&self.seconds, candidate.second()) {
                    None => {
                        candidate = truncate_to_minute(candidate) + Duration::minutes(1);
                        continue;
                    }
                    Some(s) => {
                        return with_time(candidate, candidate.hour(), candidate.minute(), s);
                    }
                }
            }
            return Some(candidate);
        }
        None
    }

    fn day_matches(&self, at: DateTime<Utc>) -> bool {
        let dom_ok = self.days_of_month.contains(&at.day());
        let dow_ok = self
            .days_of_week
            .contains(&at.weekday().num_days_from_sunday());
        match (self.dom_restricted, self.dow_restricted) {
            // Both restricted: standard cron fires on either match.
            (true, true) => dom_ok || dow_ok,
            (true, false) => dom_ok,
            (false, true) => dow_ok,
            (false, false) => true,
        }
    }
}

/// Parse one field into its sorted allowed values. The bool reports
/// whether the field restricts anything (`*` and `*/1` do not).
fn parse_field(
    field: &str,
    min: u32,
    max: u32,
    names: Option<&[&str]>,
) -> Result<(Vec<u32>, bool), OrchestratorError> {
    let bad = |detail: &str| OrchestratorError::InvalidCron(format!("field '{field}': {detail}"));

    let mut values = Vec::new();
    let mut restricted = false;

    for part in field.split(',') {
        if part.is_empty() {
            return Err(bad("empty list element"));
        }
        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| bad("step is not a number"))?;
                if step == 0 {
                    return Err(bad("step of zero"));
                }
                (r, step)
            }
            None => (part, 1),
        };

        let (lo, hi, is_wildcard) = if range_part == "*" {
            (min, max, true)
        } else if let Some((a, b)) = range_part.split_once('-') {
            let lo = parse_value(a, names).ok_or_else(|| bad("bad range start"))?;
            let hi = parse_value(b, names).ok_or_else(|| bad("bad range end"))?;
            if lo > hi {
                return Err(bad("range start exceeds end"));
            }
            (lo, hi, false)
        } else {
            let v = parse_value(range_part, names).ok_or_else(|| bad("not a value"))?;
            (v, v, false)
        };

        if lo < min || hi > max {
            return Err(bad("value out of range"));
        }
        if !is_wildcard || step > 1 {
            restricted = true;
        }

        let mut v = lo;
        while v <= hi {
            values.push(v);
            v += step;
        }
    }

    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        return Err(bad("matches nothing"));
    }
    Ok((values, restricted))
}

fn parse_value(token: &str, names: Option<&[&str]>) -> Option<u32> {
    if let Ok(v) = token.parse() {
        return Some(v);
    }
    let names = names?;
    let lowered = token.to_ascii_lowercase();
    names
        .iter()
        .position(|n| *n == lowered)
        .map(|idx| idx as u32 + if names.len() == 12 { 1 } else { 0 })
}

/// Smallest list element `>= v`.
fn next_in(values: &[u32], v: u32) -> Option<u32> {
    values.iter().copied().find(|x| *x >= v)
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp() - i64::from(at.second()), 0)
        .single()
        .unwrap_or(at)
}

fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0).single().unwrap_or(at)
}

fn with_time(at: DateTime<Utc>, hour: u32, minute: u32, second: u32) -> Option<DateTime<Utc>> {
    at.date_naive()
        .and_hms_opt(hour, minute, second)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn start_of_next_day(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let next = at.date_naive().succ_opt()?;
    next.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

fn start_of_next_month(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if at.month() == 12 {
        (at.year() + 1, 1)
    } else {
        (at.year(), at.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
