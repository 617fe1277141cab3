//! HTTP layer: the handler chain registered for the `http` protocol.
//!
//! [`HttpApplication`] owns an axum [`Router`] and forwards the request
//! carried by the connection scope to it. Unknown paths answer with the
//! JSON error body of [`GatewayError::NoRouteMatch`].

pub mod handlers;

use async_trait::async_trait;
use axum::Router;
use axum::response::Response;
use tower::ServiceExt;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::dispatch::{ConnectionScope, Handler, Transport};
use crate::error::{ErrorBody, ErrorResponse, GatewayError};
use handlers::system::{HealthResponse, WebSocketRouteInfo};

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::system::websocket_routes_handler,
    ),
    components(schemas(HealthResponse, WebSocketRouteInfo, ErrorResponse, ErrorBody)),
    tags(
        (name = "System", description = "Health and configuration endpoints.")
    )
)]
pub struct ApiDoc;

/// Builds the complete HTTP router.
pub fn build_router(state: AppState) -> Router {
    let router = handlers::system::routes()
        .fallback(handlers::system::not_found_handler)
        .with_state(state);
    with_swagger_ui(router)
}

#[cfg(feature = "swagger-ui")]
fn with_swagger_ui(router: Router) -> Router {
    router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn with_swagger_ui(router: Router) -> Router {
    router
}

/// Handler serving plain HTTP connections.
#[derive(Debug, Clone)]
pub struct HttpApplication {
    router: Router,
}

impl HttpApplication {
    /// Creates the HTTP application over `state`.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }
}

#[async_trait]
impl Handler for HttpApplication {
    async fn handle(&self, mut scope: ConnectionScope) -> Result<Response, GatewayError> {
        let Transport::Http(request) = scope.take_transport() else {
            return Err(GatewayError::MissingTransport("http"));
        };
        match self.router.clone().oneshot(request).await {
            Ok(response) => Ok(response),
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ChannelLayer;
    use axum::body::Body;
    use axum::http::{self, StatusCode};

    fn app() -> HttpApplication {
        HttpApplication::new(AppState::new(
            "codblog.settings",
            vec!["ws/chat/".to_string()],
            ChannelLayer::new(4),
        ))
    }

    async fn get(path: &str) -> (StatusCode, serde_json::Value) {
        let Ok(request) = http::Request::builder().uri(path).body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(scope) = ConnectionScope::from_request(request).await else {
            panic!("plain request builds a scope");
        };
        let Ok(response) = app().handle(scope).await else {
            panic!("http application should answer");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body should be readable");
        };
        let Ok(value) = serde_json::from_slice(&bytes) else {
            panic!("body should be JSON");
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_settings_module() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("status").and_then(|v| v.as_str()), Some("healthy"));
        assert_eq!(
            body.get("settings_module").and_then(|v| v.as_str()),
            Some("codblog.settings")
        );
    }

    #[tokio::test]
    async fn lists_websocket_routes() {
        let (status, body) = get("/config/websocket-routes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body.pointer("/0/path").and_then(|v| v.as_str()),
            Some("/ws/chat/")
        );
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let (status, body) = get("/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body.pointer("/error/code").and_then(serde_json::Value::as_u64),
            Some(2001)
        );
    }

    #[tokio::test]
    async fn detached_scope_is_missing_transport() {
        let scope = ConnectionScope::new("http", "/health");
        assert!(matches!(
            app().handle(scope).await,
            Err(GatewayError::MissingTransport("http"))
        ));
    }

    #[test]
    fn openapi_lists_system_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/config/websocket-routes"));
        assert_eq!(format!("{ApiDoc:?}"), "ApiDoc");
    }
}
