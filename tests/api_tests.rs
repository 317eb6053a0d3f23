//! HTTP-level tests for the task API.
//!
//! Requests are driven straight through the router with `oneshot`, against a
//! fresh in-memory database per test.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use pomodoro_tasks::api::{AppState, build_router};
use pomodoro_tasks::db::Database;
use pomodoro_tasks::types::Task;
use serde_json::{Value, json};
use tower::ServiceExt;

const ORIGIN: &str = "http://localhost:5173";

fn setup() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"));
    let state = AppState::new(Arc::clone(&db), ORIGIN).unwrap();
    (build_router(state), db)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn raw_request(method: &str, uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create(app: &Router, body: Value) -> Task {
    let (status, body) = send(app, json_request("POST", "/api/tasks", body)).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    serde_json::from_value(body).unwrap()
}

async fn list(app: &Router) -> Vec<Task> {
    let (status, body) = send(app, empty_request("GET", "/api/tasks")).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn create_with_title_only_fills_defaults() {
        let (app, _db) = setup();

        let (status, body) = send(
            &app,
            json_request("POST", "/api/tasks", json!({ "title": "Buy milk" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Buy milk");
        assert_eq!(body["completed"], false);
        assert_eq!(body["pomodoros"], 0);
        assert_eq!(body["estimatedPomodoros"], 1);
        assert!(body["id"].is_i64());
        assert!(body["createdAt"].is_string());
        assert!(body["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn client_supplied_id_is_ignored() {
        let (app, _db) = setup();

        let task = create(&app, json!({ "id": 4242, "title": "Mine" })).await;
        assert_ne!(task.id, 4242);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let (app, db) = setup();

        let (status, body) = send(&app, raw_request("POST", "/api/tasks", "{\"title\":")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "invalid request body" }));
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_title_is_400() {
        let (app, db) = setup();

        let (status, _) = send(
            &app,
            json_request("POST", "/api/tasks", json!({ "description": "no title" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_title_is_400() {
        let (app, _db) = setup();

        let (status, _) = send(&app, json_request("POST", "/api/tasks", json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_field_type_is_400() {
        let (app, _db) = setup();

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/tasks",
                json!({ "title": "x", "pomodoros": "three" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn empty_list_is_empty_array() {
        let (app, _db) = setup();

        let (status, body) = send(&app, empty_request("GET", "/api/tasks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn newest_task_is_listed_first() {
        let (app, _db) = setup();

        let a = create(&app, json!({ "title": "A" })).await;
        let b = create(&app, json!({ "title": "B" })).await;

        let ids: Vec<i64> = list(&app).await.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn created_task_round_trips_through_list() {
        let (app, _db) = setup();

        let created = create(
            &app,
            json!({
                "title": "Deep work",
                "description": "focus block",
                "completed": false,
                "pomodoros": 2,
                "estimatedPomodoros": 4
            }),
        )
        .await;

        assert_eq!(list(&app).await, vec![created]);
    }
}

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (app, _db) = setup();
        let task = create(&app, json!({ "title": "Plan", "description": "old" })).await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/tasks/{}", task.id),
                json!({ "completed": true }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let updated: Task = serde_json::from_value(body).unwrap();
        assert!(updated.completed);
        assert_eq!(updated.description, "old");
        assert_eq!(updated.title, "Plan");
        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn explicit_false_is_applied() {
        let (app, _db) = setup();
        let task = create(&app, json!({ "title": "Undo", "completed": true })).await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/tasks/{}", task.id),
                json!({ "completed": false }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed"], false);
    }

    #[tokio::test]
    async fn unknown_id_is_404_and_store_unchanged() {
        let (app, db) = setup();
        let task = create(&app, json!({ "title": "Stay" })).await;

        let (status, body) = send(
            &app,
            json_request("PATCH", "/api/tasks/9999", json!({ "completed": true })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "task not found" }));
        assert_eq!(db.list_tasks().unwrap(), vec![task]);
    }

    #[tokio::test]
    async fn unknown_id_wins_over_bad_body() {
        let (app, _db) = setup();

        let (status, _) = send(&app, raw_request("PATCH", "/api/tasks/9999", "not json")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_400_and_store_unchanged() {
        let (app, db) = setup();
        let task = create(&app, json!({ "title": "Intact" })).await;

        let (status, _) = send(
            &app,
            raw_request("PATCH", &format!("/api/tasks/{}", task.id), "{oops"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(db.get_task(task.id).unwrap(), task);
    }

    #[tokio::test]
    async fn blank_title_update_is_400() {
        let (app, _db) = setup();
        let task = create(&app, json!({ "title": "Named" })).await;

        let (status, _) = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/tasks/{}", task.id),
                json!({ "title": "  " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_numeric_id_is_404() {
        let (app, _db) = setup();

        let (status, _) = send(
            &app,
            json_request("PATCH", "/api/tasks/abc", json!({ "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn delete_then_delete_again() {
        let (app, _db) = setup();
        let task = create(&app, json!({ "title": "Temp" })).await;
        let uri = format!("/api/tasks/{}", task.id);

        let (status, body) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        assert!(list(&app).await.iter().all(|t| t.id != task.id));

        let (status, body) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "task not found" }));
    }
}

mod stats_tests {
    use super::*;

    #[tokio::test]
    async fn stats_reflect_tasks() {
        let (app, _db) = setup();
        create(&app, json!({ "title": "a", "pomodoros": 2, "estimatedPomodoros": 3 })).await;
        create(&app, json!({ "title": "b", "pomodoros": 4, "completed": true })).await;
        create(&app, json!({ "title": "c", "estimatedPomodoros": 5 })).await;

        let (status, body) = send(&app, empty_request("GET", "/api/stats")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "totalPomodoros": 6,
                "completedTasks": 1,
                "totalTasks": 3,
                "remainingPomodoros": (3 + 5) - 6
            })
        );
    }
}

mod cors_tests {
    use super::*;

    #[tokio::test]
    async fn allowed_origin_gets_cors_headers() {
        let (app, _db) = setup();

        let req = Request::builder()
            .method("GET")
            .uri("/api/tasks")
            .header(header::ORIGIN, ORIGIN)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin() {
        let (app, _db) = setup();

        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/tasks/1")
            .header(header::ORIGIN, ORIGIN)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let methods = resp.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn other_origin_is_rejected_before_handlers() {
        let (app, db) = setup();

        let req = Request::builder()
            .method("POST")
            .uri("/api/tasks")
            .header(header::ORIGIN, "http://evil.example")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "title": "sneaky" }).to_string()))
            .unwrap();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn request_without_origin_passes() {
        let (app, _db) = setup();

        let (status, _) = send(&app, empty_request("GET", "/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
    }
}

mod storage_failure_tests {
    use super::*;

    fn break_store(db: &Database) {
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE tasks")?;
            Ok(())
        })
        .unwrap();
    }

    #[tokio::test]
    async fn storage_errors_are_500_with_generic_message() {
        let (app, db) = setup();
        break_store(&db);

        let (status, body) = send(&app, empty_request("GET", "/api/tasks")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to list tasks" }));

        let (status, body) = send(
            &app,
            json_request("POST", "/api/tasks", json!({ "title": "lost" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to create task" }));

        let (status, body) = send(
            &app,
            json_request("PATCH", "/api/tasks/1", json!({ "completed": true })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to update task" }));

        let (status, body) = send(&app, empty_request("DELETE", "/api/tasks/1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to delete task" }));

        let (status, body) = send(&app, empty_request("GET", "/api/stats")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to compute stats" }));
    }
}
