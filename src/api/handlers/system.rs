//! System endpoints: health check, WebSocket route catalog, fallback.

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    settings_module: String,
    websocket_connections: usize,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, version, settings module and the number of open WebSocket connections.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings_module: state.settings_module.to_string(),
            websocket_connections: state.channel_layer.receiver_count(),
        }),
    )
}

/// One entry of the WebSocket route catalog.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebSocketRouteInfo {
    pattern: String,
    path: String,
}

/// `GET /config/websocket-routes` — List WebSocket endpoints.
#[utoipa::path(
    get,
    path = "/config/websocket-routes",
    tag = "System",
    summary = "List WebSocket routes",
    description = "Returns the WebSocket path patterns in match order.",
    responses(
        (status = 200, description = "WebSocket route catalog", body = Vec<WebSocketRouteInfo>),
    )
)]
pub async fn websocket_routes_handler(State(state): State<AppState>) -> impl IntoResponse {
    let routes: Vec<WebSocketRouteInfo> = state
        .websocket_routes
        .iter()
        .map(|pattern| WebSocketRouteInfo {
            pattern: pattern.clone(),
            path: format!("/{pattern}"),
        })
        .collect();
    (StatusCode::OK, Json(routes))
}

/// Fallback for unknown HTTP paths.
pub async fn not_found_handler(uri: Uri) -> Response {
    GatewayError::NoRouteMatch(uri.path().to_string()).into_response()
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/websocket-routes", get(websocket_routes_handler))
}
