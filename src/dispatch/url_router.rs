//! Ordered path routing for a handler chain.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use super::pattern::PathPattern;
use super::scope::{ConnectionScope, MatchedRoute};
use super::{BoxHandler, Handler};
use crate::error::GatewayError;

#[derive(Debug)]
struct Route {
    pattern: PathPattern,
    handler: BoxHandler,
}

/// Routes a connection to the first handler whose pattern matches its path.
///
/// Patterns are checked in registration order against the path with its
/// leading `/` removed, so `ws/chat/` matches a request for `/ws/chat/`.
#[derive(Debug, Default)]
pub struct UrlRouter {
    routes: Vec<Route>,
}

impl UrlRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Earlier routes take precedence.
    #[must_use]
    pub fn route<H>(mut self, pattern: PathPattern, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.routes.push(Route {
            pattern,
            handler: Arc::new(handler),
        });
        self
    }

    /// Registered pattern sources, in match order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| route.pattern.as_str().to_string())
            .collect()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl Handler for UrlRouter {
    async fn handle(&self, mut scope: ConnectionScope) -> Result<Response, GatewayError> {
        let requested = scope.path().to_string();
        let path = requested.strip_prefix('/').unwrap_or(&requested);

        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                tracing::debug!(path = %requested, pattern = %route.pattern, "route matched");
                scope.attach_route(MatchedRoute {
                    pattern: route.pattern.as_str().to_string(),
                    params,
                });
                return route.handler.handle(scope).await;
            }
        }

        Err(GatewayError::NoRouteMatch(requested))
    }
}
