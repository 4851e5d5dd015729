//! Handler for the `add` command.

use super::ScheduleArgs;
use anyhow::{bail, Result};
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::TaskRepo;

/// Handles adding a new draft task.
///
/// # Errors
/// Returns error if the name is taken, the schedule flags are malformed,
/// or the database is unavailable.
pub fn handle(
    config: &Config,
    name: &str,
    description: Option<&str>,
    schedule: &ScheduleArgs,
) -> Result<()> {
    let rule = schedule.to_rule().inspect_err(|e| {
        tracing::warn!(error = %e, "rejected schedule input");
    })?;

    let conn = Db::connect(config)?;
    let repo = TaskRepo::new(&conn);

    if repo.find_by_name(name)?.is_some() {
        bail!("Task named '{name}' already exists");
    }

    let task_id = repo.add(name, description, &rule)?;
    tracing::info!(task_id, name, "task added");

    println!(
        "{} Added task #{} [{}] ({})",
        "✓".green(),
        task_id,
        name.yellow(),
        rule.describe().dimmed()
    );
    println!("   Run `delivery enable {task_id}` to schedule it.");
    Ok(())
}
