//! Handler for the `duplicate` command.

use anyhow::{Context, Result};
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::TaskRepo;
use delivery::engine::resolver::TaskResolver;

/// Copies a task into a fresh draft with no run history.
///
/// # Errors
/// Returns error if the task cannot be found or the copy cannot be saved.
pub fn handle(config: &Config, task_ref: &str) -> Result<()> {
    let conn = Db::connect(config)?;
    let task = TaskResolver::new(&conn).resolve(task_ref)?.task;

    let repo = TaskRepo::new(&conn);
    let copy_id = repo.duplicate(&task)?;
    let copy = repo
        .find_by_id(copy_id)?
        .context("Duplicated task vanished")?;
    tracing::info!(source = task.id, copy = copy_id, "task duplicated");

    println!(
        "{} Duplicated [{}] as #{} [{}]",
        "✓".green(),
        task.name,
        copy.id,
        copy.name.yellow()
    );
    Ok(())
}
