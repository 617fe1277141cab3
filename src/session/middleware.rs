//! Session-context wrapper.
//!
//! Resolves the session named by the connection's session cookie and
//! attaches a [`SessionHandle`] before delegating. Resolution never
//! rejects a connection: a missing or malformed cookie, an unknown or
//! expired key, a store error and a lookup timeout all yield an empty
//! anonymous session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::response::Response;

use super::cookies;
use super::handle::SessionHandle;
use super::store::{SessionKey, SessionStore};
use crate::dispatch::{ConnectionScope, Handler};
use crate::error::GatewayError;

/// Session middleware settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Cookie carrying the session key.
    pub cookie_name: String,
    /// Lifetime applied when a session is saved.
    pub ttl: Duration,
    /// Upper bound on a single store lookup.
    pub lookup_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "sessionid".to_string(),
            ttl: Duration::from_secs(1_209_600),
            lookup_timeout: Duration::from_secs(2),
        }
    }
}

/// Wraps a handler with session resolution.
#[derive(Debug)]
pub struct SessionMiddleware<H> {
    inner: H,
    store: Arc<dyn SessionStore>,
    settings: SessionSettings,
}

impl<H> SessionMiddleware<H> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: H, store: Arc<dyn SessionStore>, settings: SessionSettings) -> Self {
        Self {
            inner,
            store,
            settings,
        }
    }

    /// Resolves the session named by the cookie in `headers`. Never fails.
    pub async fn resolve(&self, headers: &HeaderMap) -> SessionHandle {
        let raw = cookies::cookie(headers, &self.settings.cookie_name);
        self.resolve_cookie(raw).await
    }

    /// Resolves the session for a raw cookie value. Never fails.
    pub async fn resolve_cookie(&self, raw: Option<String>) -> SessionHandle {
        let anonymous =
            || SessionHandle::anonymous(Arc::clone(&self.store), self.settings.ttl);

        let Some(raw) = raw else {
            return anonymous();
        };
        let Some(key) = SessionKey::parse(&raw) else {
            tracing::debug!("ignoring malformed session cookie");
            return anonymous();
        };

        match tokio::time::timeout(self.settings.lookup_timeout, self.store.load(&key)).await {
            Ok(Ok(Some(record))) => {
                SessionHandle::from_record(record, Arc::clone(&self.store), self.settings.ttl)
            }
            Ok(Ok(None)) => {
                tracing::debug!("session cookie names no live session");
                anonymous()
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "session lookup failed; continuing anonymously");
                anonymous()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.settings.lookup_timeout.as_millis(),
                    "session lookup timed out; continuing anonymously"
                );
                anonymous()
            }
        }
    }
}

#[async_trait]
impl<H> Handler for SessionMiddleware<H>
where
    H: Handler,
{
    async fn handle(&self, mut scope: ConnectionScope) -> Result<Response, GatewayError> {
        // The scope is not `Sync`, so no borrow of it may live across the lookup.
        let raw = cookies::cookie(scope.headers(), &self.settings.cookie_name);
        let session = self.resolve_cookie(raw).await;
        scope.attach_session(session);
        self.inner.handle(scope).await
    }
}
