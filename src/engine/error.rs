//! Typed errors for operator-supplied schedule input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid time '{0}' (expected HH:MM or HH:MM:SS)")]
    InvalidTime(String),

    #[error("--{0} requires --time")]
    MissingTime(&'static str),

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },
}
