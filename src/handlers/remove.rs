//! Handler for the `remove` command.

use anyhow::{bail, Result};
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::TaskRepo;
use delivery::engine::resolver::TaskResolver;

/// Deletes a task and its run history.
///
/// # Errors
/// Returns error if the task cannot be found or the deletion fails.
pub fn handle(config: &Config, task_ref: &str) -> Result<()> {
    let mut conn = Db::connect(config)?;
    let task = TaskResolver::strict(&conn).resolve(task_ref)?.task;

    if task.latest_run.as_ref().is_some_and(|r| r.is_active(super::now())) {
        bail!("Task [{}] has a run in progress", task.name);
    }

    let tx = conn.transaction()?;
    TaskRepo::new(&tx).remove(task.id)?;
    tx.commit()?;
    tracing::info!(task_id = task.id, "task removed");

    println!("{} Removed [{}]", "✗".red(), task.name);
    Ok(())
}
