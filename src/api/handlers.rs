//! Request handlers for the task API.
//!
//! Each handler checks the request shape, makes one call into the database,
//! and maps the outcome to a status code. Storage failures are logged here
//! with their cause; clients only see a generic message.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::debug;

use super::server::AppState;
use crate::error::{ApiError, ApiResult};
use crate::types::{DeleteConfirmation, NewTask, Stats, Task, TaskPatch};

/// Resolve the `{id}` path segment. An id that is not an integer can't name
/// a task, so it is reported as not found.
fn task_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!(%rejection, "Rejected task id");
            Err(ApiError::task_not_found())
        }
    }
}

/// Unwrap a JSON body, collapsing every rejection into a generic 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            debug!(%rejection, "Rejected request body");
            Err(ApiError::invalid_body())
        }
    }
}

fn check_shape(result: Result<(), String>) -> ApiResult<()> {
    result.map_err(|reason| {
        debug!(%reason, "Request body failed validation");
        ApiError::invalid_body()
    })
}

/// `GET /api/tasks`
pub(super) async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .db()
        .list_tasks()
        .map_err(|e| ApiError::from_store(e, "failed to list tasks"))?;
    Ok(Json(tasks))
}

/// `POST /api/tasks`
pub(super) async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let input = json_body(payload)?;
    check_shape(input.validate())?;

    let task = state
        .db()
        .create_task(input)
        .map_err(|e| ApiError::from_store(e, "failed to create task"))?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PATCH /api/tasks/{id}`
pub(super) async fn update_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = task_id(path)?;

    // An unknown id is a 404 even when the body is also malformed
    state
        .db()
        .get_task(id)
        .map_err(|e| ApiError::from_store(e, "failed to update task"))?;

    let patch = json_body(payload)?;
    check_shape(patch.validate())?;

    let task = state
        .db()
        .update_task(id, patch)
        .map_err(|e| ApiError::from_store(e, "failed to update task"))?;
    Ok(Json(task))
}

/// `DELETE /api/tasks/{id}`
pub(super) async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteConfirmation>> {
    let id = task_id(path)?;

    state
        .db()
        .delete_task(id)
        .map_err(|e| ApiError::from_store(e, "failed to delete task"))?;
    Ok(Json(DeleteConfirmation {
        message: "task deleted".to_string(),
    }))
}

/// `GET /api/stats`
pub(super) async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<Stats>> {
    let stats = state
        .db()
        .get_stats()
        .map_err(|e| ApiError::from_store(e, "failed to compute stats"))?;
    Ok(Json(stats))
}
