//! Handler for the `run` command.

use super::now;
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::ops;

/// Opens a `running` run for a task.
///
/// The delivery itself is performed elsewhere; it reports back through
/// `delivery finish`.
///
/// # Errors
/// Returns error if the task is missing or its state forbids a manual run.
pub fn handle(config: &Config, task_ref: &str, strict: bool) -> Result<()> {
    let mut conn = Db::connect(config)?;
    let (task, run_id) = ops::start_run(&mut conn, task_ref, strict, now())?;

    println!(
        "{} Started run #{} of [{}]",
        "▶".blue(),
        run_id,
        task.name.yellow()
    );
    println!("   Report the outcome with `delivery finish {run_id} --status <success|failed|skipped>`");
    Ok(())
}
