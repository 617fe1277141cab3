//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Dispatch
//! errors terminate only the connection they occur on; the hosting server
//! turns them into a protocol-level rejection through [`IntoResponse`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "no route found for path: /ws/unknown/"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Protocol        | 400 Bad Request           |
/// | 2000–2999 | Routing         | 404 Not Found             |
/// | 3000–3999 | Server          | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The connection's protocol kind has no entry in the route table.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The request asked for a WebSocket upgrade but the handshake is invalid.
    #[error("websocket handshake rejected: {0}")]
    HandshakeRejected(String),

    /// No registered path pattern matched the connection path.
    #[error("no route found for path: {0}")]
    NoRouteMatch(String),

    /// The authentication wrapper ran without a session in the scope.
    #[error("session not attached: the session middleware must wrap the auth middleware")]
    SessionNotAttached,

    /// A terminal handler received a scope without the transport it needs.
    #[error("missing {0} transport in connection scope")]
    MissingTransport(&'static str),

    /// A path pattern could not be parsed.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidRoute {
        /// The offending pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// Session or user store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::UnsupportedProtocol(_) => 1001,
            Self::HandshakeRejected(_) => 1002,
            Self::NoRouteMatch(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::SessionNotAttached => 3002,
            Self::MissingTransport(_) => 3003,
            Self::InvalidRoute { .. } => 3004,
            Self::InvalidConfig(_) => 3005,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedProtocol(_) | Self::HandshakeRejected(_) => StatusCode::BAD_REQUEST,
            Self::NoRouteMatch(_) => StatusCode::NOT_FOUND,
            Self::SessionNotAttached
            | Self::MissingTransport(_)
            | Self::InvalidRoute { .. }
            | Self::Persistence(_)
            | Self::InvalidConfig(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_map_to_rejections() {
        let unsupported = GatewayError::UnsupportedProtocol("ftp".to_string());
        assert_eq!(unsupported.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.error_code(), 1001);

        let no_route = GatewayError::NoRouteMatch("/ws/unknown/".to_string());
        assert_eq!(no_route.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(no_route.error_code(), 2001);
    }

    #[test]
    fn wiring_errors_are_server_errors() {
        assert_eq!(
            GatewayError::SessionNotAttached.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::MissingTransport("websocket").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn into_response_carries_status() {
        let response = GatewayError::NoRouteMatch("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn message_names_the_path() {
        let err = GatewayError::NoRouteMatch("/ws/unknown/".to_string());
        assert_eq!(err.to_string(), "no route found for path: /ws/unknown/");
    }
}
