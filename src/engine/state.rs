//! Derived State Engine: Computes what an operator can do with a task.
//!
//! This module answers "what is the state of this task right now?" by
//! looking at its administrative status, schedule and last run. The
//! result drives which controls the console renders and enables.
//!
//! Everything here is pure: the caller supplies `now`.

use super::types::{DeliveryTask, OneTimeTrigger, RunStatus, ScheduleRule, TaskStatus};
use chrono::NaiveDateTime;
use serde::Serialize;

/// The derived (computed) status of a task.
///
/// Unlike `TaskStatus` (which is stored), `DerivedStatus` is computed
/// from the schedule, the run history and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedStatus {
    /// Not yet enabled
    Draft,
    /// One-time task waiting for its moment
    Scheduled,
    /// A run is in progress
    Running,
    /// One-time task whose moment passed without a run
    Overdue,
    /// One-time task that has run
    Completed,
    /// One-time task whose run failed
    Failed,
    /// Enabled (recurring, or one-time immediate)
    Active,
    /// Recurring task on hold
    Paused,
}

impl DerivedStatus {
    /// Returns the display color hint for UI rendering.
    #[must_use]
    pub fn color_hint(&self) -> &'static str {
        match self {
            DerivedStatus::Active | DerivedStatus::Completed => "green",
            DerivedStatus::Scheduled | DerivedStatus::Running => "blue",
            DerivedStatus::Overdue | DerivedStatus::Paused => "amber",
            DerivedStatus::Failed => "red",
            DerivedStatus::Draft => "gray",
        }
    }

    /// Returns true if the task can never run again without duplication.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, DerivedStatus::Completed | DerivedStatus::Failed)
    }
}

impl std::fmt::Display for DerivedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerivedStatus::Draft => write!(f, "DRAFT"),
            DerivedStatus::Scheduled => write!(f, "SCHEDULED"),
            DerivedStatus::Running => write!(f, "RUNNING"),
            DerivedStatus::Overdue => write!(f, "OVERDUE"),
            DerivedStatus::Completed => write!(f, "COMPLETED"),
            DerivedStatus::Failed => write!(f, "FAILED"),
            DerivedStatus::Active => write!(f, "ACTIVE"),
            DerivedStatus::Paused => write!(f, "PAUSED"),
        }
    }
}

/// Derived status plus the controls it unlocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedState {
    pub status: DerivedStatus,
    pub can_enable: bool,
    pub can_run_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DerivedState {
    fn new(status: DerivedStatus, can_enable: bool, can_run_now: bool) -> Self {
        Self {
            status,
            can_enable,
            can_run_now,
            message: None,
        }
    }

    fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Derives the current state of a task.
///
/// Rules are checked in priority order and the first match wins. The
/// last run status is taken from `DeliveryTask::observed_run_status`, so a
/// run stuck in `running` past the staleness window counts as failed.
#[must_use]
pub fn derive_state(task: &DeliveryTask, now: NaiveDateTime) -> DerivedState {
    let last_run = task.observed_run_status(now);

    if last_run == Some(RunStatus::Running) {
        return DerivedState::new(DerivedStatus::Running, false, false)
            .with_message("A run is in progress");
    }

    let ScheduleRule::OneTime { trigger } = &task.schedule else {
        return derive_recurring(task.status);
    };

    if task.run_count > 0 {
        let status = if last_run == Some(RunStatus::Failed) {
            DerivedStatus::Failed
        } else {
            DerivedStatus::Completed
        };
        return DerivedState::new(status, false, false)
            .with_message("One-time task already ran; duplicate it to run again");
    }

    let is_active = task.status == TaskStatus::Active;

    match trigger {
        Some(OneTimeTrigger::Immediate) => {
            let status = if task.status == TaskStatus::Draft {
                DerivedStatus::Draft
            } else {
                DerivedStatus::Active
            };
            DerivedState::new(status, true, true)
        }
        Some(OneTimeTrigger::Scheduled { at }) if *at < now => {
            DerivedState::new(DerivedStatus::Overdue, false, true)
                .with_message("Scheduled time has passed; run it manually")
        }
        Some(OneTimeTrigger::Scheduled { .. }) => {
            let status = if is_active {
                DerivedStatus::Scheduled
            } else {
                DerivedStatus::Draft
            };
            DerivedState::new(status, !is_active, true)
        }
        None => DerivedState::new(DerivedStatus::Draft, true, true)
            .with_message("Schedule is not configured"),
    }
}

fn derive_recurring(status: TaskStatus) -> DerivedState {
    let derived = match status {
        TaskStatus::Active => DerivedStatus::Active,
        TaskStatus::Paused => DerivedStatus::Paused,
        TaskStatus::Draft | TaskStatus::Completed => DerivedStatus::Draft,
    };
    DerivedState::new(derived, status != TaskStatus::Active, true)
}

/// A task with its derived state pre-computed.
///
/// Useful for list rendering where you need both task data and state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithState {
    pub task: DeliveryTask,
    pub state: DerivedState,
}

impl TaskWithState {
    #[must_use]
    pub fn new(task: DeliveryTask, now: NaiveDateTime) -> Self {
        let state = derive_state(&task, now);
        Self { task, state }
    }
}

/// Batch-derives state for multiple tasks against a single `now`.
#[must_use]
pub fn derive_all_states(tasks: Vec<DeliveryTask>, now: NaiveDateTime) -> Vec<TaskWithState> {
    tasks
        .into_iter()
        .map(|task| TaskWithState::new(task, now))
        .collect()
}

/// Active or scheduled tasks whose cached next run is still ahead, soonest first.
///
/// A cached `next_run_at` that already passed is skipped; nothing refreshes it
/// until the task is enabled or a run finishes.
#[must_use]
pub fn upcoming(states: &[TaskWithState], now: NaiveDateTime, limit: usize) -> Vec<&TaskWithState> {
    let mut upcoming: Vec<_> = states
        .iter()
        .filter(|t| t.task.next_run_at.is_some_and(|at| at >= now))
        .filter(|t| matches!(t.state.status, DerivedStatus::Active | DerivedStatus::Scheduled))
        .collect();
    upcoming.sort_by_key(|t| t.task.next_run_at);
    upcoming.truncate(limit);
    upcoming
}

/// Aggregate counts of tasks by derived status.
#[derive(Debug, Default, Serialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub scheduled: usize,
    pub running: usize,
    pub overdue: usize,
    pub completed: usize,
    pub failed: usize,
    pub active: usize,
    pub paused: usize,
}

impl StatusCounts {
    #[must_use]
    pub fn from_states(tasks: &[TaskWithState]) -> Self {
        let mut counts = Self::default();
        for t in tasks {
            match t.state.status {
                DerivedStatus::Draft => counts.draft += 1,
                DerivedStatus::Scheduled => counts.scheduled += 1,
                DerivedStatus::Running => counts.running += 1,
                DerivedStatus::Overdue => counts.overdue += 1,
                DerivedStatus::Completed => counts.completed += 1,
                DerivedStatus::Failed => counts.failed += 1,
                DerivedStatus::Active => counts.active += 1,
                DerivedStatus::Paused => counts.paused += 1,
            }
        }
        counts
    }

    /// One-line breakdown naming every bucket, so the parts add up to the total.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} tasks: {} active, {} scheduled, {} running, {} overdue, {} paused, {} draft, {} done, {} failed",
            self.total(),
            self.active,
            self.scheduled,
            self.running,
            self.overdue,
            self.paused,
            self.draft,
            self.completed,
            self.failed
        )
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.draft
            + self.scheduled
            + self.running
            + self.overdue
            + self.completed
            + self.failed
            + self.active
            + self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{DeliveryRun, Frequency, Recurrence};
    use chrono::NaiveTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn make_task(status: TaskStatus, schedule: ScheduleRule) -> DeliveryTask {
        DeliveryTask {
            id: 1,
            name: "weekly digest".to_string(),
            description: None,
            status,
            schedule,
            run_count: 0,
            last_run_status: None,
            next_run_at: None,
            last_run_at: None,
            created_at: "2026-01-01 00:00:00".to_string(),
            latest_run: None,
        }
    }

    fn daily() -> ScheduleRule {
        ScheduleRule::recurring(Recurrence {
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            frequency: Frequency::Daily,
            start_date: None,
            end_date: None,
        })
    }

    #[test]
    fn test_running_run_locks_everything() {
        let mut task = make_task(TaskStatus::Active, daily());
        task.latest_run = Some(DeliveryRun {
            id: 7,
            task_id: 1,
            status: RunStatus::Running,
            started_at: at("2026-03-10 09:58"),
            finished_at: None,
            message: None,
        });
        let state = derive_state(&task, at("2026-03-10 10:00"));
        assert_eq!(state.status, DerivedStatus::Running);
        assert!(!state.can_enable);
        assert!(!state.can_run_now);
    }

    #[test]
    fn test_stale_running_run_is_ignored() {
        let mut task = make_task(TaskStatus::Active, daily());
        task.latest_run = Some(DeliveryRun {
            id: 7,
            task_id: 1,
            status: RunStatus::Running,
            started_at: at("2026-03-10 09:50"),
            finished_at: None,
            message: None,
        });
        let state = derive_state(&task, at("2026-03-10 10:00"));
        assert_eq!(state.status, DerivedStatus::Active);
        assert!(state.can_run_now);
    }

    #[test]
    fn test_executed_one_time_is_locked_regardless_of_status() {
        for status in [
            TaskStatus::Draft,
            TaskStatus::Active,
            TaskStatus::Paused,
            TaskStatus::Completed,
        ] {
            let mut task = make_task(status, ScheduleRule::immediate());
            task.run_count = 1;
            task.last_run_status = Some(RunStatus::Success);
            let state = derive_state(&task, at("2026-03-10 10:00"));
            assert_eq!(state.status, DerivedStatus::Completed);
            assert!(!state.can_enable);
            assert!(!state.can_run_now);
        }
    }

    #[test]
    fn test_executed_one_time_with_failed_run() {
        let mut task = make_task(TaskStatus::Completed, ScheduleRule::at(at("2026-03-01 09:00")));
        task.run_count = 1;
        task.last_run_status = Some(RunStatus::Failed);
        let state = derive_state(&task, at("2026-03-10 10:00"));
        assert_eq!(state.status, DerivedStatus::Failed);
        assert!(state.status.is_locked());
    }

    #[test]
    fn test_immediate_follows_draft_flag() {
        let now = at("2026-03-10 10:00");
        let draft = derive_state(&make_task(TaskStatus::Draft, ScheduleRule::immediate()), now);
        assert_eq!(draft.status, DerivedStatus::Draft);
        assert!(draft.can_enable && draft.can_run_now);

        let active = derive_state(&make_task(TaskStatus::Active, ScheduleRule::immediate()), now);
        assert_eq!(active.status, DerivedStatus::Active);
        assert!(active.can_enable && active.can_run_now);
    }

    #[test]
    fn test_past_scheduled_is_overdue() {
        let task = make_task(TaskStatus::Active, ScheduleRule::at(at("2026-03-01 09:00")));
        let state = derive_state(&task, at("2026-03-10 10:00"));
        assert_eq!(state.status, DerivedStatus::Overdue);
        assert!(!state.can_enable);
        assert!(state.can_run_now);
    }

    #[test]
    fn test_future_scheduled() {
        let now = at("2026-03-10 10:00");
        let rule = ScheduleRule::at(at("2026-03-20 09:00"));

        let active = derive_state(&make_task(TaskStatus::Active, rule), now);
        assert_eq!(active.status, DerivedStatus::Scheduled);
        assert!(!active.can_enable);
        assert!(active.can_run_now);

        let draft = derive_state(&make_task(TaskStatus::Draft, rule), now);
        assert_eq!(draft.status, DerivedStatus::Draft);
        assert!(draft.can_enable);
    }

    #[test]
    fn test_unconfigured_one_time_is_draft() {
        let task = make_task(TaskStatus::Active, ScheduleRule::default());
        let state = derive_state(&task, at("2026-03-10 10:00"));
        assert_eq!(state.status, DerivedStatus::Draft);
        assert!(state.can_enable && state.can_run_now);
        assert!(state.message.is_some());
    }

    #[test]
    fn test_recurring_mirrors_status() {
        let now = at("2026-03-10 10:00");
        let cases = [
            (TaskStatus::Active, DerivedStatus::Active, false),
            (TaskStatus::Paused, DerivedStatus::Paused, true),
            (TaskStatus::Draft, DerivedStatus::Draft, true),
        ];
        for (status, expected, can_enable) in cases {
            let mut task = make_task(status, daily());
            task.run_count = 12;
            let state = derive_state(&task, now);
            assert_eq!(state.status, expected);
            assert_eq!(state.can_enable, can_enable);
            assert!(state.can_run_now);
        }
    }

    #[test]
    fn test_derive_is_idempotent() {
        let task = make_task(TaskStatus::Active, ScheduleRule::at(at("2026-03-01 09:00")));
        let now = at("2026-03-10 10:00");
        assert_eq!(derive_state(&task, now), derive_state(&task, now));
    }

    #[test]
    fn test_status_counts() {
        let now = at("2026-03-10 10:00");
        let tasks = vec![
            make_task(TaskStatus::Active, daily()),
            make_task(TaskStatus::Paused, daily()),
            make_task(TaskStatus::Active, ScheduleRule::at(at("2026-03-01 09:00"))),
        ];
        let counts = StatusCounts::from_states(&derive_all_states(tasks, now));
        assert_eq!(counts.active, 1);
        assert_eq!(counts.paused, 1);
        assert_eq!(counts.overdue, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_summary_names_every_bucket() {
        let counts = StatusCounts {
            draft: 1,
            scheduled: 2,
            running: 3,
            overdue: 4,
            completed: 5,
            failed: 6,
            active: 7,
            paused: 8,
        };
        let summary = counts.summary();
        assert!(summary.starts_with("36 tasks:"));
        assert!(summary.contains("4 overdue"));
        assert!(summary.contains("6 failed"));

        let listed: usize = summary
            .split(": ")
            .nth(1)
            .unwrap()
            .split(", ")
            .map(|part| part.split(' ').next().unwrap().parse::<usize>().unwrap())
            .sum();
        assert_eq!(listed, counts.total());
    }

    #[test]
    fn test_upcoming_skips_past_cached_runs() {
        let now = at("2026-03-10 10:00");
        let mut stale = make_task(TaskStatus::Active, daily());
        stale.id = 1;
        stale.next_run_at = Some(at("2026-02-01 09:00"));
        let mut later = make_task(TaskStatus::Active, daily());
        later.id = 2;
        later.next_run_at = Some(at("2026-03-12 09:00"));
        let mut sooner = make_task(TaskStatus::Active, daily());
        sooner.id = 3;
        sooner.next_run_at = Some(at("2026-03-11 09:00"));
        let paused = make_task(TaskStatus::Paused, daily());

        let states = derive_all_states(vec![stale, later, sooner, paused], now);
        let ids: Vec<_> = upcoming(&states, now, 5).iter().map(|t| t.task.id).collect();
        assert_eq!(ids, [3, 2]);
        assert_eq!(upcoming(&states, now, 1).len(), 1);
    }
}
