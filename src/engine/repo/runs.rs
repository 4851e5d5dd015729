//! Run Repository: Append-only execution records.

use crate::engine::types::{DeliveryRun, RunStatus};
use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

const RUN_SELECT: &str = "SELECT id, task_id, status, started_at, finished_at, message FROM runs";

pub struct RunRepo<'a> {
    conn: &'a Connection,
}

impl<'a> RunRepo<'a> {
    /// Creates a new run repository instance.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Opens a `running` record for a task.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn start(&self, task_id: i64, started_at: NaiveDateTime) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO runs (task_id, status, started_at) VALUES (?1, ?2, ?3)",
            params![task_id, RunStatus::Running.to_string(), started_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Closes a run with its final outcome.
    ///
    /// # Errors
    /// Returns an error if the run is unknown, already finished, or the
    /// outcome is `running`.
    pub fn finish(
        &self,
        run_id: i64,
        status: RunStatus,
        finished_at: NaiveDateTime,
        message: Option<&str>,
    ) -> Result<()> {
        if status == RunStatus::Running {
            bail!("A run cannot finish as 'running'");
        }
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, message = ?3
             WHERE id = ?4 AND finished_at IS NULL",
            params![status.to_string(), finished_at, message, run_id],
        )?;
        if updated == 0 {
            bail!("Run #{run_id} does not exist or is already finished");
        }
        Ok(())
    }

    /// Finds a run by its ID.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get(&self, run_id: i64) -> Result<Option<DeliveryRun>> {
        let sql = format!("{RUN_SELECT} WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![run_id], row_to_run)
            .optional()?)
    }

    /// Gets the most recent run recorded for a task.
    ///
    /// # Errors
    /// Returns a `rusqlite` error if query logic fails.
    pub fn get_latest(&self, task_id: i64) -> rusqlite::Result<Option<DeliveryRun>> {
        let sql = format!("{RUN_SELECT} WHERE task_id = ?1 ORDER BY started_at DESC, id DESC LIMIT 1");
        self.conn
            .query_row(&sql, params![task_id], row_to_run)
            .optional()
    }

    /// Retrieves the full run history for a task, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_history(&self, task_id: i64) -> Result<Vec<DeliveryRun>> {
        let sql = format!("{RUN_SELECT} WHERE task_id = ?1 ORDER BY started_at DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![task_id], row_to_run)?;

        let mut runs = Vec::new();
        for r in rows {
            runs.push(r?);
        }
        Ok(runs)
    }

    /// Retrieves global run history joined with task names.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_global_history(&self, limit: usize) -> Result<Vec<(String, DeliveryRun)>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, r.id, r.task_id, r.status, r.started_at, r.finished_at, r.message
             FROM runs r
             JOIN tasks t ON r.task_id = t.id
             ORDER BY r.started_at DESC, r.id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            let name: String = row.get(0)?;
            let run = DeliveryRun {
                id: row.get(1)?,
                task_id: row.get(2)?,
                status: RunStatus::from(row.get::<_, String>(3)?),
                started_at: row.get(4)?,
                finished_at: row.get(5)?,
                message: row.get(6)?,
            };
            Ok((name, run))
        })?;

        let mut history = Vec::new();
        for item in rows {
            history.push(item?);
        }
        Ok(history)
    }
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<DeliveryRun> {
    Ok(DeliveryRun {
        id: row.get(0)?,
        task_id: row.get(1)?,
        status: RunStatus::from(row.get::<_, String>(2)?),
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        message: row.get(5)?,
    })
}
