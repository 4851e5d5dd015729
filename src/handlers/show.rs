//! Handler for the `show` command.

use super::{format_moment, now, run_label, status_icon};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::RunRepo;
use delivery::engine::resolver::TaskResolver;
use delivery::engine::state::{derive_state, DerivedState, DerivedStatus};
use delivery::engine::types::{DeliveryRun, DeliveryTask, RunStatus};
use serde::Serialize;

/// Explains the derived state of a task and shows its run log.
///
/// # Errors
/// Returns error if task resolution or DB query fails.
pub fn handle(config: &Config, task_ref: &str, json: bool) -> Result<()> {
    let conn = Db::connect(config)?;
    let run_repo = RunRepo::new(&conn);
    let now = now();

    let task = TaskResolver::new(&conn).resolve(task_ref)?.task;
    let state = derive_state(&task, now);
    let runs = run_repo.get_history(task.id)?;

    if json {
        let report = TaskReport {
            task: &task,
            state: &state,
            runs: &runs,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} #{} [{}]",
        status_icon(state.status),
        task.id,
        task.name.cyan().bold()
    );
    if let Some(description) = &task.description {
        println!("   {}", description.dimmed());
    }
    println!("   Status:   {} ({})", state.status, state.status.color_hint().dimmed());
    println!("   Stored:   {}", task.status);
    println!("   Schedule: {}", task.schedule.describe());
    println!("   Next run: {}", format_moment(task.next_run_at));
    println!("   Last run: {}", format_moment(task.last_run_at));
    println!("   Runs:     {}", task.run_count);
    println!(
        "   Controls: enable {}  run-now {}",
        yes_no(state.can_enable),
        yes_no(state.can_run_now)
    );
    println!();

    print_explanation(&task, &state, now);
    println!();
    print_history(&runs, now);

    Ok(())
}

#[derive(Serialize)]
struct TaskReport<'a> {
    task: &'a DeliveryTask,
    state: &'a DerivedState,
    runs: &'a [DeliveryRun],
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".red()
    }
}

fn print_explanation(task: &DeliveryTask, state: &DerivedState, now: chrono::NaiveDateTime) {
    let reason = match state.status {
        DerivedStatus::Running => "reason:".blue(),
        DerivedStatus::Failed | DerivedStatus::Overdue => "reason:".red(),
        _ => "reason:".yellow(),
    };

    if let Some(message) = &state.message {
        println!("{reason} {message}.");
    } else {
        println!("{reason} {}.", default_explanation(state.status));
    }

    if let Some(run) = &task.latest_run {
        if run.status == RunStatus::Running && !run.is_active(now) {
            println!(
                "         Run #{} started {} and never reported back; treated as failed.",
                run.id,
                format_moment(Some(run.started_at))
            );
        }
    }
}

fn default_explanation(status: DerivedStatus) -> &'static str {
    match status {
        DerivedStatus::Draft => "Not enabled yet",
        DerivedStatus::Scheduled => "Waiting for its scheduled time",
        DerivedStatus::Active => "Enabled and following its schedule",
        DerivedStatus::Paused => "Paused; enable it to resume",
        DerivedStatus::Running => "A run is in progress",
        DerivedStatus::Overdue => "Scheduled time has passed",
        DerivedStatus::Completed => "Already ran",
        DerivedStatus::Failed => "The last run failed",
    }
}

fn print_history(runs: &[DeliveryRun], now: chrono::NaiveDateTime) {
    println!("{}", "Run Log:".dimmed().underline());
    if runs.is_empty() {
        println!("   (No runs)");
        return;
    }

    for run in runs {
        let status = run.effective_status(now);
        let note = run.message.as_deref().unwrap_or_default();
        println!(
            "   {}  #{:<4} {}  {}",
            format_moment(Some(run.started_at)).dimmed(),
            run.id,
            run_label(status),
            note.dimmed()
        );
    }
}
