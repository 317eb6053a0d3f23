//! Core types for the task API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default planned work sessions for a new task.
pub const DEFAULT_ESTIMATED_POMODOROS: i64 = 1;

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    /// Completed work sessions.
    pub pomodoros: i64,
    /// Planned work sessions.
    pub estimated_pomodoros: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a task.
///
/// Server-owned fields (`id`, `createdAt`, `updatedAt`) are ignored if a
/// client sends them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub pomodoros: Option<i64>,
    #[serde(default)]
    pub estimated_pomodoros: Option<i64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Check the shape rules the schema can't express as a 400.
    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)
    }
}

/// Request body for a partial update.
///
/// A field that is absent (or `null`) leaves the stored value alone. Any
/// present value is written, including `false`, `0` and `""`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub pomodoros: Option<i64>,
    #[serde(default)]
    pub estimated_pomodoros: Option<i64>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), String> {
        match self.title {
            Some(ref title) => validate_title(title),
            None => Ok(()),
        }
    }

    /// Apply the present fields on top of an existing task.
    pub fn apply(self, task: Task) -> Task {
        Task {
            title: self.title.unwrap_or(task.title),
            description: self.description.unwrap_or(task.description),
            completed: self.completed.unwrap_or(task.completed),
            pomodoros: self.pomodoros.unwrap_or(task.pomodoros),
            estimated_pomodoros: self.estimated_pomodoros.unwrap_or(task.estimated_pomodoros),
            ..task
        }
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("title must not be empty".to_string());
    }
    Ok(())
}

/// Aggregate numbers across all tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Sum of `pomodoros` over every task.
    pub total_pomodoros: i64,
    pub completed_tasks: i64,
    pub total_tasks: i64,
    /// Estimated pomodoros of incomplete tasks minus pomodoros of all tasks.
    /// Can be negative.
    pub remaining_pomodoros: i64,
}

/// Body returned by a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}
