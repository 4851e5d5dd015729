//! Handler for the `pause` command.

use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;
use delivery::engine::resolver::TaskResolver;

/// Takes an active task off the schedule.
///
/// # Errors
/// Returns error if the task cannot be found or is not active.
pub fn handle(config: &Config, task_ref: &str) -> Result<()> {
    let conn = Db::connect(config)?;
    let task = TaskResolver::new(&conn).resolve(task_ref)?.task;

    let status = ops::pause(&conn, &task)?;

    println!("{} [{}] is now {}", "‖".yellow(), task.name.yellow(), status);
    Ok(())
}
