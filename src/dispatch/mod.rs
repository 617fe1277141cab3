//! Connection dispatch: protocol routing, URL routing and the handler trait.
//!
//! Every stage of a handler chain implements [`Handler`]. Wrappers hold
//! their inner handler by value, augment the [`ConnectionScope`] and
//! delegate; terminal handlers turn the scope into a response.
//!
//! ```text
//! Application (tower::Service)
//!     │
//!     └── ProtocolRouter
//!           ├── http      → HttpApplication
//!           └── websocket → SessionMiddleware
//!                             └── AuthMiddleware
//!                                   └── UrlRouter → GroupConsumer
//! ```

pub mod pattern;
pub mod protocol_router;
pub mod scope;
pub mod url_router;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use crate::error::GatewayError;

pub use pattern::{PathPattern, RouteParams};
pub use protocol_router::{Application, ProtocolRouter};
pub use scope::{ConnectionScope, MatchedRoute, ProtocolKind, ScopeField, Transport};
pub use url_router::UrlRouter;

/// A stage in a connection handler chain.
#[async_trait]
pub trait Handler: Send + Sync + fmt::Debug {
    /// Processes one connection, consuming its scope.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the connection must be rejected.
    async fn handle(&self, scope: ConnectionScope) -> Result<Response, GatewayError>;
}

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

#[async_trait]
impl<H> Handler for Arc<H>
where
    H: Handler + ?Sized,
{
    async fn handle(&self, scope: ConnectionScope) -> Result<Response, GatewayError> {
        (**self).handle(scope).await
    }
}
