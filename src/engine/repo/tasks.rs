//! Task Repository: Core task operations and cached run fields.

use super::runs::RunRepo;
use crate::engine::types::{DeliveryTask, RunStatus, ScheduleRule, TaskStatus};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

pub const TASK_SELECT: &str = "SELECT id, name, description, status, schedule_rule, run_count, \
     last_run_status, next_run_at, last_run_at, created_at FROM tasks";

pub struct TaskRepo<'a> {
    conn: &'a Connection,
}

impl<'a> TaskRepo<'a> {
    /// Creates a new repository instance borrowing the connection.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Adds a new draft task to the database.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn add(
        &self,
        name: &str,
        description: Option<&str>,
        schedule: &ScheduleRule,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tasks (name, description, status, schedule_rule) VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                description,
                TaskStatus::Draft.to_string(),
                serde_json::to_string(schedule)?
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Retrieves all tasks from the database.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn get_all(&self) -> Result<Vec<DeliveryTask>> {
        let sql = format!("{TASK_SELECT} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |r| self.row_to_task(r))?;
        let mut tasks = Vec::new();
        for task in rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }

    /// Finds a task by its name (case-insensitive).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_name(&self, name: &str) -> Result<Option<DeliveryTask>> {
        let sql = format!("{TASK_SELECT} WHERE LOWER(name) = LOWER(?1)");
        self.conn
            .query_row(&sql, params![name], |r| self.row_to_task(r))
            .optional()
            .context("Search by name failed")
    }

    /// Finds a task by its internal ID.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_by_id(&self, id: i64) -> Result<Option<DeliveryTask>> {
        let sql = format!("{TASK_SELECT} WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], |r| self.row_to_task(r))
            .optional()
            .context("Search by ID failed")
    }

    /// Updates the administrative status together with the cached next run.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn update_status(
        &self,
        id: i64,
        status: TaskStatus,
        next_run_at: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET status = ?1, next_run_at = ?2 WHERE id = ?3",
            params![status.to_string(), next_run_at, id],
        )?;
        Ok(())
    }

    /// Replaces the schedule rule and the cached next run.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn update_schedule(
        &self,
        id: i64,
        schedule: &ScheduleRule,
        next_run_at: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET schedule_rule = ?1, next_run_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(schedule)?, next_run_at, id],
        )?;
        Ok(())
    }

    /// Stamps the cached run fields when a run starts.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn record_run_start(&self, id: i64, started_at: NaiveDateTime) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET run_count = run_count + 1, last_run_at = ?1, last_run_status = ?2
             WHERE id = ?3",
            params![started_at, RunStatus::Running.to_string(), id],
        )?;
        Ok(())
    }

    /// Updates the cached status of the last run.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn record_run_status(&self, id: i64, status: RunStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE tasks SET last_run_status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        Ok(())
    }

    /// Copies a task's name, description and schedule into a fresh draft.
    ///
    /// # Errors
    /// Returns an error if the insertion fails.
    pub fn duplicate(&self, task: &DeliveryTask) -> Result<i64> {
        let name = self.free_copy_name(&task.name)?;
        self.add(&name, task.description.as_deref(), &task.schedule)
    }

    /// Deletes a task and its runs.
    ///
    /// # Errors
    /// Returns an error if the deletion fails.
    pub fn remove(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM runs WHERE task_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn free_copy_name(&self, name: &str) -> Result<String> {
        let mut candidate = format!("{name} (copy)");
        let mut n = 2;
        while self.find_by_name(&candidate)?.is_some() {
            candidate = format!("{name} (copy {n})");
            n += 1;
        }
        Ok(candidate)
    }

    /// Converts a database row to a `DeliveryTask`.
    ///
    /// # Errors
    /// Returns a `rusqlite` error if data conversion fails.
    pub fn row_to_task(&self, row: &rusqlite::Row) -> rusqlite::Result<DeliveryTask> {
        let id: i64 = row.get(0)?;
        let run_repo = RunRepo::new(self.conn);
        let latest_run = run_repo.get_latest(id)?;

        let raw_rule: String = row.get(4)?;
        let schedule = serde_json::from_str(&raw_rule)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(DeliveryTask {
            id,
            name: row.get(1)?,
            description: row.get(2)?,
            status: TaskStatus::from(row.get::<_, String>(3)?),
            schedule,
            run_count: row.get(5)?,
            last_run_status: row.get::<_, Option<String>>(6)?.map(RunStatus::from),
            next_run_at: row.get(7)?,
            last_run_at: row.get(8)?,
            created_at: row.get(9)?,
            latest_run,
        })
    }
}
