//! HTTP transport.
//!
//! A stateless JSON-RPC endpoint at POST /mcp plus a health route. Every
//! request stands alone: the bearer token comes from the Authorization
//! header of that request and nothing survives between calls.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use crate::error::Result;
use crate::mcp::server::{McpServer, SERVER_NAME, SERVER_VERSION};

/// Build the gateway's router.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(mcp_endpoint))
        .route("/healthz", get(healthz))
        .with_state(server)
}

/// Serve the HTTP transport until the process stops.
pub async fn serve(server: Arc<McpServer>) -> Result<()> {
    let addr = server.context().config.bind_addr();
    let base_url = server.context().config.base_url.clone();
    let app = router(server);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, %base_url, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn mcp_endpoint(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let bearer = bearer_token(&headers);
    match server.handle_message(&body, bearer.as_deref()).await {
        Some(response) => Json(response).into_response(),
        // Notification: acknowledged, nothing to say
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn healthz(State(server): State<Arc<McpServer>>) -> Json<serde_json::Value> {
    let ctx = server.context();
    Json(serde_json::json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "transport": ctx.config.transport.as_str(),
        "auth": ctx.config.auth.label(),
        "degraded": ctx.is_degraded(),
    }))
}

/// Extract the bearer token from an Authorization header, if any.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
