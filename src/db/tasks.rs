//! Task CRUD operations.

use super::{Database, now_ms};
use crate::error::{StoreError, StoreResult};
use crate::types::{DEFAULT_ESTIMATED_POMODOROS, NewTask, Task, TaskPatch};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::debug;

const TASK_COLUMNS: &str = "id, title, description, completed, pomodoros, \
                            estimated_pomodoros, created_at, updated_at";

// Positions in TASK_COLUMNS
const CREATED_AT_IDX: usize = 6;
const UPDATED_AT_IDX: usize = 7;

fn millis_to_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        completed: row.get("completed")?,
        pomodoros: row.get("pomodoros")?,
        estimated_pomodoros: row.get("estimated_pomodoros")?,
        created_at: millis_to_datetime(row, CREATED_AT_IDX)?,
        updated_at: millis_to_datetime(row, UPDATED_AT_IDX)?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, task_id: i64) -> StoreResult<Task> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    match conn.query_row(&sql, params![task_id], parse_task_row) {
        Ok(task) => Ok(task),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(task_id)),
        Err(e) => Err(e.into()),
    }
}

impl Database {
    /// List every task, most recently created first.
    pub fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.with_conn(|conn| {
            // id breaks ties between tasks created in the same millisecond
            let sql = format!(
                "SELECT {} FROM tasks ORDER BY created_at DESC, id DESC",
                TASK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Insert a new task. The id and both timestamps are assigned here.
    pub fn create_task(&self, input: NewTask) -> StoreResult<Task> {
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    title, description, completed, pomodoros, estimated_pomodoros,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.title,
                    input.description.unwrap_or_default(),
                    input.completed.unwrap_or(false),
                    input.pomodoros.unwrap_or(0),
                    input
                        .estimated_pomodoros
                        .unwrap_or(DEFAULT_ESTIMATED_POMODOROS),
                    now,
                    now,
                ],
            )?;

            let task_id = conn.last_insert_rowid();
            debug!(task_id, "Created task");
            get_task_internal(conn, task_id)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: i64) -> StoreResult<Task> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Overwrite the fields present in `patch` and return the stored row.
    ///
    /// `updated_at` always moves forward, by at least one millisecond.
    pub fn update_task(&self, task_id: i64, patch: TaskPatch) -> StoreResult<Task> {
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing = get_task_internal(&tx, task_id)?;
            let updated_at = now.max(existing.updated_at.timestamp_millis() + 1);
            let merged = patch.apply(existing);

            tx.execute(
                "UPDATE tasks SET
                    title = ?1, description = ?2, completed = ?3, pomodoros = ?4,
                    estimated_pomodoros = ?5, updated_at = ?6
                WHERE id = ?7",
                params![
                    merged.title,
                    merged.description,
                    merged.completed,
                    merged.pomodoros,
                    merged.estimated_pomodoros,
                    updated_at,
                    task_id,
                ],
            )?;

            let task = get_task_internal(&tx, task_id)?;
            tx.commit()?;

            debug!(task_id, "Updated task");
            Ok(task)
        })
    }

    /// Permanently remove a task.
    pub fn delete_task(&self, task_id: i64) -> StoreResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if affected == 0 {
                return Err(StoreError::NotFound(task_id));
            }
            debug!(task_id, "Deleted task");
            Ok(())
        })
    }
}
