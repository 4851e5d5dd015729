//! Core types for the delivery console.
//!
//! Note: `DerivedStatus` (the computed state) lives in `state.rs`.
//! `TaskStatus` here is the administrative status stored in SQLite.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes after which a run still marked `running` is presumed dead.
pub const STALE_RUN_TIMEOUT_MINUTES: i64 = 5;

/// Administrative status stored in the database.
///
/// The status shown to operators is computed by `state::derive_state()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            _ => Self::Draft,
        }
    }
}

/// Outcome of a single delivery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => Self::Running,
            "success" => Self::Success,
            "skipped" => Self::Skipped,
            _ => Self::Failed,
        }
    }
}

/// How often a recurring task repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// When a one-time task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "snake_case")]
pub enum OneTimeTrigger {
    /// Fires as soon as the task is activated.
    Immediate,
    /// Fires at a local wall-clock moment.
    Scheduled { at: NaiveDateTime },
}

/// Repetition settings of a recurring task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub time: NaiveTime,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Schedule configuration of a task.
///
/// A `None` payload means the operator has not finished configuring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleRule {
    OneTime {
        #[serde(default)]
        trigger: Option<OneTimeTrigger>,
    },
    Recurring {
        #[serde(default)]
        recurrence: Option<Recurrence>,
    },
}

impl ScheduleRule {
    #[must_use]
    pub fn immediate() -> Self {
        Self::OneTime {
            trigger: Some(OneTimeTrigger::Immediate),
        }
    }

    #[must_use]
    pub fn at(at: NaiveDateTime) -> Self {
        Self::OneTime {
            trigger: Some(OneTimeTrigger::Scheduled { at }),
        }
    }

    #[must_use]
    pub fn recurring(recurrence: Recurrence) -> Self {
        Self::Recurring {
            recurrence: Some(recurrence),
        }
    }

    #[must_use]
    pub fn is_one_time(&self) -> bool {
        matches!(self, Self::OneTime { .. })
    }

    /// Human summary used by the console listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::OneTime { trigger: None } | Self::Recurring { recurrence: None } => {
                "not configured".to_string()
            }
            Self::OneTime {
                trigger: Some(OneTimeTrigger::Immediate),
            } => "once, on activation".to_string(),
            Self::OneTime {
                trigger: Some(OneTimeTrigger::Scheduled { at }),
            } => format!("once at {}", at.format("%Y-%m-%d %H:%M")),
            Self::Recurring {
                recurrence: Some(r),
            } => {
                let mut s = format!("{} at {}", r.frequency, r.time.format("%H:%M"));
                if let Some(start) = r.start_date {
                    s.push_str(&format!(" from {start}"));
                }
                if let Some(end) = r.end_date {
                    s.push_str(&format!(" until {end}"));
                }
                s
            }
        }
    }
}

impl Default for ScheduleRule {
    fn default() -> Self {
        Self::OneTime { trigger: None }
    }
}

/// A configured delivery job.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryTask {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub schedule: ScheduleRule,
    pub run_count: u32,
    /// Cached on the row; see `observed_run_status()` for the effective value.
    pub last_run_status: Option<RunStatus>,
    pub next_run_at: Option<NaiveDateTime>,
    pub last_run_at: Option<NaiveDateTime>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_run: Option<DeliveryRun>,
}

impl DeliveryTask {
    /// Last run status with stale `running` runs resolved to `failed`.
    #[must_use]
    pub fn observed_run_status(&self, now: NaiveDateTime) -> Option<RunStatus> {
        match &self.latest_run {
            Some(run) => Some(run.effective_status(now)),
            None => self.last_run_status,
        }
    }
}

/// One execution record of a task. Runs are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRun {
    pub id: i64,
    pub task_id: i64,
    pub status: RunStatus,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub message: Option<String>,
}

impl DeliveryRun {
    /// Returns true if the run is `running` and inside the staleness window.
    #[must_use]
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.status == RunStatus::Running
            && now - self.started_at < Duration::minutes(STALE_RUN_TIMEOUT_MINUTES)
    }

    /// Status as the console should treat it at `now`.
    #[must_use]
    pub fn effective_status(&self, now: NaiveDateTime) -> RunStatus {
        if self.status == RunStatus::Running && !self.is_active(now) {
            return RunStatus::Failed;
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn run(status: RunStatus, started_at: &str) -> DeliveryRun {
        DeliveryRun {
            id: 1,
            task_id: 1,
            status,
            started_at: at(started_at),
            finished_at: None,
            message: None,
        }
    }

    #[test]
    fn test_running_run_inside_window_is_active() {
        let r = run(RunStatus::Running, "2026-03-01 10:00");
        assert!(r.is_active(at("2026-03-01 10:04")));
        assert_eq!(r.effective_status(at("2026-03-01 10:04")), RunStatus::Running);
    }

    #[test]
    fn test_running_run_past_window_is_failed() {
        let r = run(RunStatus::Running, "2026-03-01 10:00");
        assert!(!r.is_active(at("2026-03-01 10:10")));
        assert_eq!(r.effective_status(at("2026-03-01 10:10")), RunStatus::Failed);
    }

    #[test]
    fn test_window_boundary_counts_as_stale() {
        let r = run(RunStatus::Running, "2026-03-01 10:00");
        assert_eq!(r.effective_status(at("2026-03-01 10:05")), RunStatus::Failed);
    }

    #[test]
    fn test_finished_runs_keep_their_status() {
        let r = run(RunStatus::Success, "2026-03-01 10:00");
        assert_eq!(r.effective_status(at("2026-03-02 10:00")), RunStatus::Success);
    }

    #[test]
    fn test_schedule_rule_json_shape() {
        let rule = ScheduleRule::recurring(Recurrence {
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            frequency: Frequency::Weekly,
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31),
        });
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["type"], "recurring");
        assert_eq!(json["recurrence"]["frequency"], "weekly");
        assert_eq!(json["recurrence"]["end_date"], "2026-12-31");
        assert!(json["recurrence"].get("start_date").is_none());
    }

    #[test]
    fn test_incomplete_rule_parses_without_payload() {
        let rule: ScheduleRule = serde_json::from_str(r#"{"type":"one_time"}"#).unwrap();
        assert_eq!(rule, ScheduleRule::OneTime { trigger: None });
        let rule: ScheduleRule = serde_json::from_str(r#"{"type":"recurring"}"#).unwrap();
        assert_eq!(rule, ScheduleRule::Recurring { recurrence: None });
    }

    #[test]
    fn test_unknown_status_strings_fall_back() {
        assert_eq!(TaskStatus::from("archived".to_string()), TaskStatus::Draft);
        assert_eq!(RunStatus::from("weird".to_string()), RunStatus::Failed);
    }
}
