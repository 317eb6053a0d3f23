//! HTTP API module.
//!
//! Exposes task CRUD and stats under `/api`.

mod handlers;
mod server;

pub use server::{AppState, ServerHandle, build_router, start_server};
