//! Schedule Deriver: computes when a task should next run.
//!
//! All values are local wall-clock times; nothing here converts timezones.
//! Parsing helpers for operator input live here too, so callers can log
//! and report malformed dates before a rule ever reaches the deriver.

use super::error::ScheduleError;
use super::types::{Frequency, OneTimeTrigger, Recurrence, ScheduleRule, TaskStatus};
use chrono::{Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Computes the next execution time of a rule.
///
/// Only an `Active` task has a next run; every other status clears it.
/// Returns `None` for incomplete rules and for recurring rules whose next
/// occurrence would fall after their end date.
#[must_use]
pub fn compute_next_run(
    rule: &ScheduleRule,
    status: TaskStatus,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if status != TaskStatus::Active {
        return None;
    }

    let next = match rule {
        ScheduleRule::OneTime {
            trigger: Some(OneTimeTrigger::Immediate),
        } => Some(now),
        // Past-due detection belongs to the state deriver.
        ScheduleRule::OneTime {
            trigger: Some(OneTimeTrigger::Scheduled { at }),
        } => Some(*at),
        ScheduleRule::Recurring {
            recurrence: Some(recurrence),
        } => next_occurrence(recurrence, now),
        ScheduleRule::OneTime { trigger: None } | ScheduleRule::Recurring { recurrence: None } => {
            None
        }
    };

    tracing::debug!(rule = %rule.describe(), ?next, "computed next run");
    next
}

/// Next occurrence of a recurring rule relative to `now`.
///
/// Advances at most one period when today's slot has already passed.
fn next_occurrence(recurrence: &Recurrence, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let base = match recurrence.start_date {
        Some(start) if start.and_time(NaiveTime::default()) > now => start,
        _ => now.date(),
    };

    let time = NaiveTime::from_hms_opt(recurrence.time.hour(), recurrence.time.minute(), 0)?;
    let mut candidate = base.and_time(time);

    if candidate < now {
        candidate = advance(candidate, recurrence.frequency)?;
    }

    if let Some(end) = recurrence.end_date {
        let end_of_day = end.and_hms_milli_opt(23, 59, 59, 999)?;
        if candidate > end_of_day {
            tracing::debug!(%end, %candidate, "recurrence expired");
            return None;
        }
    }

    Some(candidate)
}

/// Moves a timestamp forward by one frequency unit.
///
/// Monthly steps clamp to the last day of shorter months (Jan 31 -> Feb 28).
fn advance(at: NaiveDateTime, frequency: Frequency) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::Daily => at.checked_add_days(Days::new(1)),
        Frequency::Weekly => at.checked_add_days(Days::new(7)),
        Frequency::Monthly => at.checked_add_months(Months::new(1)),
    }
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
/// Returns `ScheduleError::InvalidDate` if the input is malformed.
pub fn parse_date(date: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(date.to_string()))
}

/// Parses an `HH:MM` or `HH:MM:SS` time of day.
///
/// # Errors
/// Returns `ScheduleError::InvalidTime` if the input is malformed.
pub fn parse_time(time: &str) -> Result<NaiveTime, ScheduleError> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .map_err(|_| ScheduleError::InvalidTime(time.to_string()))
}

/// Combines a date and a time of day into one wall-clock timestamp.
///
/// # Errors
/// Returns an error if either part is malformed.
pub fn parse_date_time(date: &str, time: &str) -> Result<NaiveDateTime, ScheduleError> {
    Ok(parse_date(date)?.and_time(parse_time(time)?))
}
