//! Handler for the `status` command.

use super::{format_moment, now, status_icon};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::TaskRepo;
use delivery::engine::state::{
    derive_all_states, upcoming, DerivedStatus, StatusCounts, TaskWithState,
};
use serde::Serialize;

const UPCOMING_LIMIT: usize = 5;

/// Displays a summary of the console.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(config: &Config, json: bool) -> Result<()> {
    let conn = Db::connect(config)?;
    let tasks = TaskRepo::new(&conn).get_all()?;
    let now = now();
    let states = derive_all_states(tasks, now);
    let counts = StatusCounts::from_states(&states);

    let next_up = upcoming(&states, now, UPCOMING_LIMIT);
    let attention: Vec<_> = states
        .iter()
        .filter(|t| matches!(t.state.status, DerivedStatus::Overdue | DerivedStatus::Failed))
        .collect();

    if json {
        let report = StatusReport {
            counts,
            upcoming: next_up.iter().map(|t| TaskView::from(*t)).collect(),
            attention: attention.iter().map(|t| TaskView::from(*t)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human(&counts, &next_up, &attention);
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    counts: StatusCounts,
    upcoming: Vec<TaskView>,
    attention: Vec<TaskView>,
}

#[derive(Serialize)]
struct TaskView {
    id: i64,
    name: String,
    status: DerivedStatus,
    next_run_at: Option<String>,
}

impl From<&TaskWithState> for TaskView {
    fn from(t: &TaskWithState) -> Self {
        Self {
            id: t.task.id,
            name: t.task.name.clone(),
            status: t.state.status,
            next_run_at: t.task.next_run_at.map(|at| at.to_string()),
        }
    }
}

fn print_human(counts: &StatusCounts, upcoming: &[&TaskWithState], attention: &[&TaskWithState]) {
    println!("{} Delivery Status", "📊".cyan());
    println!("   {}", counts.summary());

    if !attention.is_empty() {
        println!("\n   {}", "Needs attention:".red());
        for t in attention {
            println!(
                "     {} [{}] {}",
                status_icon(t.state.status),
                t.task.name.yellow(),
                t.state.status.to_string().dimmed()
            );
        }
    }

    if !upcoming.is_empty() {
        println!("\n   Next up:");
        for t in upcoming {
            println!(
                "     - {}  [{}]",
                format_moment(t.task.next_run_at).dimmed(),
                t.task.name
            );
        }
    }
}
