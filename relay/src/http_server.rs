use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::upstream::UpstreamClient;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            upstream: Arc::new(UpstreamClient::new(config)),
        }
    }
}

/// Routes: the chat relay on `/api/chat` and `/`, plus a health check.
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(relay_chat))
        .route("/api/chat", post(relay_chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(config: RelayConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let state = AppState::new(&config);
    if !state.upstream.has_credential() {
        error!("Missing API_KEY; upstream requests will fail until one is configured");
    }

    let app = build_router(state, config.body_limit_bytes());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    info!(model = config.model(), "Relay listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start HTTP server: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "relay is running"
}

/// Passes the caller's JSON through to the upstream API and answers with the
/// upstream status and body.
async fn relay_chat(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), RelayError> {
    let (status, body) = state.upstream.forward(&payload).await?;
    Ok((status, Json(body)))
}
