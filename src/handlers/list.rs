//! Handler for the `list` command.

use super::{format_moment, now, status_icon};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::TaskRepo;
use delivery::engine::state::{derive_all_states, TaskWithState};

/// Lists all tasks with their derived state.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(config: &Config, json: bool) -> Result<()> {
    let conn = Db::connect(config)?;
    let tasks = TaskRepo::new(&conn).get_all()?;
    let states = derive_all_states(tasks, now());

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    print_human(&states);
    Ok(())
}

fn print_human(states: &[TaskWithState]) {
    println!("{} All Tasks:", "📋".cyan());

    if states.is_empty() {
        println!("   (No tasks defined)");
        return;
    }

    for TaskWithState { task, state } in states {
        println!(
            "   {} #{} [{}] {} ({})",
            status_icon(state.status),
            task.id,
            task.name.blue(),
            task.schedule.describe(),
            state.status.to_string().dimmed()
        );
        if task.next_run_at.is_some() {
            println!("      next: {}", format_moment(task.next_run_at).dimmed());
        }
    }
}
