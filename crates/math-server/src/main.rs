//! math-server binary
//!
//! Serves the arithmetic tools on `MATH_SERVER_ADDR` (default
//! `127.0.0.1:8000`).

use std::future::IntoFuture;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let addr = std::env::var("MATH_SERVER_ADDR").unwrap_or_else(|_| math_server::DEFAULT_ADDR.into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("math-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  POST /mcp       - Streamable HTTP transport");
    tracing::info!("  GET  /sse       - SSE transport (events)");
    tracing::info!("  POST /messages  - SSE transport (requests)");
    tracing::info!("  GET  /health    - Health check");

    // Open SSE streams never finish on their own, so stop without draining them
    tokio::select! {
        result = axum::serve(listener, math_server::router()).into_future() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}
