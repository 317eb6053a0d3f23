//! Aggregation queries for statistics.

use super::Database;
use crate::error::StoreResult;
use crate::types::Stats;

impl Database {
    /// Get aggregate statistics over all tasks.
    ///
    /// `remaining_pomodoros` subtracts pomodoros spent on *every* task from
    /// the estimates of incomplete tasks only. Clients depend on this exact
    /// arithmetic, so it is not clamped or filtered. The subtraction wraps on
    /// overflow, like 64-bit integer arithmetic in the original server.
    pub fn get_stats(&self) -> StoreResult<Stats> {
        self.with_conn(|conn| {
            let (total_tasks, completed_tasks, total_pomodoros, estimated_incomplete): (
                i64,
                i64,
                i64,
                i64,
            ) = conn.query_row(
                "SELECT
                    COUNT(*) AS total_tasks,
                    COALESCE(SUM(CASE WHEN completed = 1 THEN 1 ELSE 0 END), 0) AS completed_tasks,
                    COALESCE(SUM(pomodoros), 0) AS total_pomodoros,
                    COALESCE(SUM(CASE WHEN completed = 0 THEN estimated_pomodoros ELSE 0 END), 0)
                        AS estimated_incomplete
                FROM tasks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

            Ok(Stats {
                total_pomodoros,
                completed_tasks,
                total_tasks,
                remaining_pomodoros: estimated_incomplete.wrapping_sub(total_pomodoros),
            })
        })
    }
}
