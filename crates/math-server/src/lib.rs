//! # math-server
//!
//! Toy MCP tool server exposing `add`, `subtract`, `multiply` and `divide`
//! over both MCP transports:
//!
//! - `POST /mcp`, `DELETE /mcp`: streamable HTTP
//! - `GET /sse` + `POST /messages?session_id=…`: legacy SSE

pub mod handlers;
pub mod rpc;
pub mod state;
pub mod tools;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Build the router over `state`
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/mcp", post(handlers::mcp_post).delete(handlers::mcp_delete))
        .route("/sse", get(handlers::sse_connect))
        .route("/messages", post(handlers::messages_post))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router with fresh state
pub fn router() -> Router {
    app(AppState::new())
}
