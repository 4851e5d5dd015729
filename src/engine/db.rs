use super::config::Config;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fs;

pub struct Db;

impl Db {
    /// Initializes the data directory and `SQLite` database schema.
    ///
    /// # Errors
    /// Returns error if directory creation, DB opening, or migration fails.
    pub fn init(config: &Config) -> Result<()> {
        if !config.data_dir().exists() {
            fs::create_dir_all(config.data_dir()).with_context(|| {
                format!("Failed to create {}", config.data_dir().display())
            })?;
        }

        let conn = Connection::open(config.db_path()).context("Failed to open database")?;
        Self::migrate(&conn)?;
        tracing::info!(path = %config.db_path().display(), "database initialized");

        Ok(())
    }

    /// Connects to an existing database.
    ///
    /// # Errors
    /// Returns error if the database file does not exist or cannot be opened.
    pub fn connect(config: &Config) -> Result<Connection> {
        let db_path = config.db_path();
        if !db_path.exists() {
            anyhow::bail!("Console not initialized. Run `delivery init` first.");
        }
        let conn = Connection::open(&db_path).context("Failed to open database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        tracing::debug!(path = %db_path.display(), "database connected");
        Ok(conn)
    }

    /// Opens a fresh in-memory database with the schema applied.
    ///
    /// # Errors
    /// Returns error if migration fails.
    pub fn open_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory().context("Failed to open database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::migrate(&conn)?;
        Ok(conn)
    }

    /// Applies the schema migrations.
    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                schedule_rule TEXT NOT NULL,
                run_count INTEGER NOT NULL DEFAULT 0,
                last_run_status TEXT,
                next_run_at TEXT,
                last_run_at TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create tasks table")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY,
                task_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                message TEXT,
                FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE
            )",
            [],
        )
        .context("Failed to create runs table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS runs_task_started ON runs (task_id, started_at)",
            [],
        )
        .context("Failed to create runs index")?;

        Ok(())
    }
}
