//! Protocol-type routing and the process-wide application entrypoint.
//!
//! [`ProtocolRouter`] is the route table: built once at startup, then only
//! read. [`Application`] wraps it in an `Arc` and exposes it as a
//! [`tower::Service`] so the HTTP server can invoke it per connection.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::Service;

use super::scope::{ConnectionScope, ProtocolKind};
use super::{BoxHandler, Handler};
use crate::error::GatewayError;

/// Immutable mapping from protocol kind to handler chain.
#[derive(Debug, Default)]
pub struct ProtocolRouter {
    routes: HashMap<ProtocolKind, BoxHandler>,
}

impl ProtocolRouter {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler chain for a protocol kind, replacing any
    /// previous entry.
    #[must_use]
    pub fn route<H>(mut self, kind: ProtocolKind, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.routes.insert(kind, Arc::new(handler));
        self
    }

    /// Returns `true` if the table has an entry for `kind`.
    #[must_use]
    pub fn supports(&self, kind: ProtocolKind) -> bool {
        self.routes.contains_key(&kind)
    }

    /// Dispatches a connection to the chain registered for its protocol.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedProtocol`] if the scope's tag is
    /// not a known protocol kind or has no entry, otherwise whatever the
    /// selected chain returns.
    pub async fn dispatch(&self, scope: ConnectionScope) -> Result<Response, GatewayError> {
        let kind: ProtocolKind = scope.protocol().parse()?;
        let handler = self
            .routes
            .get(&kind)
            .ok_or_else(|| GatewayError::UnsupportedProtocol(scope.protocol().to_string()))?;

        tracing::debug!(protocol = %kind, path = scope.path(), "dispatching connection");
        handler.handle(scope).await
    }
}

#[async_trait]
impl Handler for ProtocolRouter {
    async fn handle(&self, scope: ConnectionScope) -> Result<Response, GatewayError> {
        self.dispatch(scope).await
    }
}

/// The application entrypoint invoked by the server for every request.
///
/// Cloning is cheap: all clones share one route table.
#[derive(Debug, Clone)]
pub struct Application {
    router: Arc<ProtocolRouter>,
}

impl Application {
    /// Wraps a finished route table.
    #[must_use]
    pub fn new(router: ProtocolRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// The shared route table.
    #[must_use]
    pub fn router(&self) -> &ProtocolRouter {
        &self.router
    }

    /// Classifies a request, dispatches it, and renders any dispatch error
    /// as a rejection response.
    pub async fn serve(&self, request: Request) -> Response {
        let scope = match ConnectionScope::from_request(request).await {
            Ok(scope) => scope,
            Err(err) => {
                tracing::warn!(error = %err, "connection rejected during classification");
                return err.into_response();
            }
        };

        let protocol = scope.protocol().to_string();
        let path = scope.path().to_string();
        let client = scope.client();

        match self.router.dispatch(scope).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    protocol = %protocol,
                    path = %path,
                    client = ?client,
                    "connection rejected"
                );
                err.into_response()
            }
        }
    }
}

impl Service<Request> for Application {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let app = self.clone();
        Box::pin(async move { Ok(app.serve(request).await) })
    }
}
