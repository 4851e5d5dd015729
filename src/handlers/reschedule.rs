//! Handler for the `reschedule` command.

use super::{format_moment, now, ScheduleArgs};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;
use delivery::engine::resolver::TaskResolver;
use delivery::engine::types::TaskStatus;

/// Replaces a task's schedule.
///
/// # Errors
/// Returns error if the flags are malformed, the task is missing, or the
/// task is running or already spent.
pub fn handle(config: &Config, task_ref: &str, schedule: &ScheduleArgs) -> Result<()> {
    let rule = schedule.to_rule().inspect_err(|e| {
        tracing::warn!(error = %e, "rejected schedule input");
    })?;

    let conn = Db::connect(config)?;
    let task = TaskResolver::new(&conn).resolve(task_ref)?.task;

    let next_run = ops::reschedule(&conn, &task, &rule, now())?;

    println!(
        "{} [{}] now runs {}",
        "✓".green(),
        task.name.yellow(),
        rule.describe()
    );
    if task.status == TaskStatus::Active {
        println!("   Next run: {}", format_moment(next_run));
    }
    Ok(())
}
