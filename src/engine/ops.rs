//! Task Operations: The state transitions behind the console commands.
//!
//! Each operation checks the derived state, writes the new administrative
//! status and cached fields, and returns what changed. `now` is always
//! supplied by the caller.

use super::repo::{RunRepo, TaskRepo};
use super::resolver::TaskResolver;
use super::schedule::compute_next_run;
use super::state::{derive_state, DerivedStatus};
use super::types::{DeliveryTask, RunStatus, ScheduleRule, TaskStatus};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};

/// Outcome of reporting a run.
#[derive(Debug)]
pub struct FinishedRun {
    pub task: DeliveryTask,
    pub next_run_at: Option<NaiveDateTime>,
}

/// Activates a task and caches its next run.
///
/// # Errors
/// Returns an error if the derived state forbids enabling or the update fails.
pub fn enable(
    conn: &Connection,
    task: &DeliveryTask,
    now: NaiveDateTime,
) -> Result<Option<NaiveDateTime>> {
    let state = derive_state(task, now);
    if !state.can_enable {
        let reason = state.message.unwrap_or_else(|| format!("it is {}", state.status));
        bail!("Task [{}] cannot be enabled: {reason}", task.name);
    }

    let next_run = compute_next_run(&task.schedule, TaskStatus::Active, now);
    TaskRepo::new(conn).update_status(task.id, TaskStatus::Active, next_run)?;
    tracing::info!(task_id = task.id, ?next_run, "task enabled");
    Ok(next_run)
}

/// Takes an active task off the schedule and clears its next run.
///
/// Recurring tasks become `paused`; one-time tasks fall back to `draft`.
///
/// # Errors
/// Returns an error if the task is not active or the update fails.
pub fn pause(conn: &Connection, task: &DeliveryTask) -> Result<TaskStatus> {
    if task.status != TaskStatus::Active {
        bail!("Task [{}] is not active ({})", task.name, task.status);
    }

    let status = if task.schedule.is_one_time() {
        TaskStatus::Draft
    } else {
        TaskStatus::Paused
    };

    TaskRepo::new(conn).update_status(task.id, status, None)?;
    tracing::info!(task_id = task.id, %status, "task paused");
    Ok(status)
}

/// Replaces a task's schedule, recomputing the next run if it is active.
///
/// # Errors
/// Returns an error if the task is running or already spent.
pub fn reschedule(
    conn: &Connection,
    task: &DeliveryTask,
    rule: &ScheduleRule,
    now: NaiveDateTime,
) -> Result<Option<NaiveDateTime>> {
    let state = derive_state(task, now);
    if state.status == DerivedStatus::Running || state.status.is_locked() {
        bail!(
            "Task [{}] is {} and cannot be rescheduled",
            task.name,
            state.status
        );
    }

    let next_run = compute_next_run(rule, task.status, now);
    TaskRepo::new(conn).update_schedule(task.id, rule, next_run)?;
    tracing::info!(task_id = task.id, rule = %rule.describe(), ?next_run, "task rescheduled");
    Ok(next_run)
}

/// Opens a `running` run for a task.
///
/// The reference is resolved and the state derived inside an immediate
/// transaction, so two concurrent starts cannot both pass the check.
///
/// # Errors
/// Returns an error if the task is missing or its state forbids a manual run.
pub fn start_run(
    conn: &mut Connection,
    task_ref: &str,
    strict: bool,
    now: NaiveDateTime,
) -> Result<(DeliveryTask, i64)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let task = {
        let resolver = if strict {
            TaskResolver::strict(&tx)
        } else {
            TaskResolver::new(&tx)
        };
        resolver.resolve(task_ref)?.task
    };

    let state = derive_state(&task, now);
    if !state.can_run_now {
        let reason = state.message.unwrap_or_else(|| format!("it is {}", state.status));
        bail!("Task [{}] cannot run now: {reason}", task.name);
    }

    let run_id = RunRepo::new(&tx).start(task.id, now)?;
    TaskRepo::new(&tx).record_run_start(task.id, now)?;
    tx.commit()?;
    tracing::info!(task_id = task.id, run_id, "run started");

    Ok((task, run_id))
}

/// Closes a run and updates the task it belongs to.
///
/// The cached last-run status only follows the task's latest run. One-time
/// tasks are marked `completed`; active recurring tasks get their next run
/// recomputed.
///
/// # Errors
/// Returns an error if the run is unknown, already finished, or the outcome
/// is `running`.
pub fn finish_run(
    conn: &mut Connection,
    run_id: i64,
    status: RunStatus,
    message: Option<&str>,
    now: NaiveDateTime,
) -> Result<FinishedRun> {
    if status == RunStatus::Running {
        bail!("Use success, failed or skipped to finish a run");
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let runs = RunRepo::new(&tx);
    let tasks = TaskRepo::new(&tx);

    let Some(run) = runs.get(run_id)? else {
        bail!("Run #{run_id} not found");
    };
    if run.status == RunStatus::Running && !run.is_active(now) {
        tracing::warn!(run_id, started_at = %run.started_at, "finishing a stale run");
    }

    runs.finish(run_id, status, now, message)?;

    let is_latest = runs.get_latest(run.task_id)?.map(|r| r.id) == Some(run_id);
    if is_latest {
        tasks.record_run_status(run.task_id, status)?;
    } else {
        tracing::debug!(run_id, "superseded run; cached status left alone");
    }

    let task = tasks
        .find_by_id(run.task_id)?
        .context("Run belongs to a missing task")?;

    let next_run_at = if task.schedule.is_one_time() {
        tasks.update_status(task.id, TaskStatus::Completed, None)?;
        None
    } else if task.status == TaskStatus::Active {
        let next = compute_next_run(&task.schedule, TaskStatus::Active, now);
        tasks.update_status(task.id, TaskStatus::Active, next)?;
        next
    } else {
        None
    };

    let task = tasks
        .find_by_id(run.task_id)?
        .context("Run belongs to a missing task")?;
    tx.commit()?;
    tracing::info!(run_id, task_id = task.id, %status, "run finished");

    Ok(FinishedRun { task, next_run_at })
}
