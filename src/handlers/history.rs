//! Handler for the `history` command.

use super::{format_moment, run_label};
use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;
use delivery::engine::repo::RunRepo;

/// Displays the global run history.
///
/// # Errors
/// Returns error if database query fails.
pub fn handle(config: &Config, limit: usize) -> Result<()> {
    let conn = Db::connect(config)?;
    let run_repo = RunRepo::new(&conn);

    let history = run_repo.get_global_history(limit)?;

    println!("{} Run History (last {})", "📜".cyan(), limit);
    println!();

    if history.is_empty() {
        println!("   (No runs recorded yet)");
        return Ok(());
    }

    for (name, run) in history {
        println!(
            "   {}  {}  #{:<4} {}",
            format_moment(Some(run.started_at)).dimmed(),
            run_label(run.status),
            run.id,
            name.bold()
        );
    }

    Ok(())
}
