//! HTTP server for the task API.
//!
//! Builds the axum router, applies the cross-origin policy, and runs the
//! listener until told to stop.

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use crate::config::Config;
use crate::db::Database;

/// How long browsers may cache a preflight response.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reference to the task database.
    db: Arc<Database>,
    /// The one origin browsers may call from.
    allowed_origin: HeaderValue,
}

impl AppState {
    /// Create handler state. Fails if `allowed_origin` is not a valid header value.
    pub fn new(db: Arc<Database>, allowed_origin: &str) -> anyhow::Result<Self> {
        let allowed_origin = HeaderValue::from_str(allowed_origin)
            .with_context(|| format!("Invalid CORS origin {:?}", allowed_origin))?;
        Ok(Self { db, allowed_origin })
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the allowed origin.
    pub fn allowed_origin(&self) -> &HeaderValue {
        &self.allowed_origin
    }
}

/// Turn away cross-origin requests from anywhere but the configured origin.
///
/// Requests without an `Origin` header are not cross-origin and pass through.
async fn require_allowed_origin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if origin != state.allowed_origin() {
            warn!(origin = ?origin, path = %request.uri().path(), "Rejected request from disallowed origin");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "origin not allowed" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

fn cors_layer(state: &AppState) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(state.allowed_origin().clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            patch(handlers::update_task).delete(handlers::delete_task),
        )
        .route("/api/stats", get(handlers::get_stats))
        // Outermost layer runs first: trace, then the origin gate, then CORS
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_allowed_origin,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    /// Channel to signal shutdown.
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::error!("Server task ended abnormally: {}", e);
        }
    }
}

/// Start the HTTP server.
///
/// Binds the configured address and serves in a background task. Returns
/// once the listener is bound, so bind errors surface here.
pub async fn start_server(db: Arc<Database>, config: &Config) -> anyhow::Result<ServerHandle> {
    let state = AppState::new(db, &config.cors.allowed_origin)?;
    let app = build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let bound_addr = listener.local_addr()?;

    info!("Task API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task API shutting down");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: bound_addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
