//! Handler for the `finish` command.

use super::{format_moment, now, run_label};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;
use delivery::engine::types::{RunStatus, TaskStatus};

/// Records the outcome of a run.
///
/// # Errors
/// Returns error if the run is unknown or already finished.
pub fn handle(config: &Config, run_id: i64, status: RunStatus, message: Option<&str>) -> Result<()> {
    let mut conn = Db::connect(config)?;
    let finished = ops::finish_run(&mut conn, run_id, status, message, now())?;
    let task = &finished.task;

    println!(
        "{} Run #{} of [{}] finished",
        run_label(status),
        run_id,
        task.name.yellow()
    );
    if task.schedule.is_one_time() {
        println!("   One-time task is now {}", "completed".dimmed());
    } else if task.status == TaskStatus::Active {
        println!("   Next run: {}", format_moment(finished.next_run_at));
    }
    Ok(())
}
