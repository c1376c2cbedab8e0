//! MCP server transports.
//!
//! `es serve` speaks MCP over stdio, which is what desktop clients spawn.
//! `es serve --http` instead binds `[server].bind` and serves MCP Streamable
//! HTTP under `/mcp`, plus a plain health check.
//!
//! # Endpoints (HTTP mode)
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/mcp` | MCP Streamable HTTP endpoint |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Client configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "epstein-search": {
//!       "command": "es",
//!       "args": ["serve"],
//!       "env": { "OPENROUTER_API_KEY": "sk-or-..." }
//!     }
//!   }
//! }
//! ```
//!
//! Nothing but protocol frames may be written to stdout in stdio mode, so all
//! diagnostics go through `tracing` (stderr).

use axum::{response::IntoResponse, routing::get, Json, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::library::Library;
use crate::mcp::McpBridge;

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn run_stdio(library: Library) -> anyhow::Result<()> {
    info!("MCP server running on stdio");
    let service = McpBridge::new(library)
        .serve(rmcp::transport::stdio())
        .await?;
    service.waiting().await?;
    Ok(())
}

/// Serve MCP Streamable HTTP on `[server].bind` until the process is terminated.
pub async fn run_http(library: Library) -> anyhow::Result<()> {
    let bind_addr = library.config().server.bind.clone();
    let app = router(library);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("MCP server listening on http://{}/mcp", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(library: Library) -> Router {
    let bridge = McpBridge::new(library);
    let mcp = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest_service("/mcp", mcp)
        .route("/health", get(handle_health))
        .layer(cors)
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
