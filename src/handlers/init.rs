//! Handler for the `init` command.

use anyhow::Result;
use colored::Colorize;
use delivery::engine::config::Config;
use delivery::engine::db::Db;

/// Initializes the console database.
///
/// # Errors
/// Returns error if database initialization fails.
pub fn handle(config: &Config) -> Result<()> {
    Db::init(config)?;
    println!(
        "{} Initialized {}",
        "✓".green(),
        config.db_path().display()
    );
    Ok(())
}
