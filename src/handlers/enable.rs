//! Handler for the `enable` command.

use super::{format_moment, now};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;
use delivery::engine::resolver::TaskResolver;

/// Activates a task and caches its next run.
///
/// # Errors
/// Returns error if the task cannot be found or its state forbids enabling.
pub fn handle(config: &Config, task_ref: &str) -> Result<()> {
    let conn = Db::connect(config)?;
    let task = TaskResolver::new(&conn).resolve(task_ref)?.task;

    let next_run = ops::enable(&conn, &task, now())?;

    println!("{} Enabled [{}]", "●".green(), task.name.yellow());
    match next_run {
        Some(at) => println!("   Next run: {}", format_moment(Some(at))),
        None => println!(
            "   {} No upcoming run ({})",
            "!".yellow(),
            task.schedule.describe().dimmed()
        ),
    }
    Ok(())
}
