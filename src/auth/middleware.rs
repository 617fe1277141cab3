//! Authentication-context wrapper.
//!
//! Derives an [`Identity`] from the session attached by the session
//! middleware and attaches it before delegating. It never rejects a
//! connection for being unauthenticated; handlers decide what anonymous
//! users may do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use super::directory::UserDirectory;
use super::identity::Identity;
use super::{SESSION_USER_HASH_KEY, SESSION_USER_ID_KEY};
use crate::dispatch::{ConnectionScope, Handler};
use crate::error::GatewayError;
use crate::session::SessionHandle;

/// Wraps a handler with identity resolution.
#[derive(Debug)]
pub struct AuthMiddleware<H> {
    inner: H,
    users: Arc<dyn UserDirectory>,
    lookup_timeout: Duration,
}

impl<H> AuthMiddleware<H> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: H, users: Arc<dyn UserDirectory>, lookup_timeout: Duration) -> Self {
        Self {
            inner,
            users,
            lookup_timeout,
        }
    }

    /// Resolves the identity carried by a session. Never fails.
    pub async fn resolve(&self, session: &SessionHandle) -> Identity {
        let Some(user_id) = session
            .get(SESSION_USER_ID_KEY)
            .await
            .and_then(|v| parse_user_id(&v))
        else {
            return Identity::Anonymous;
        };

        let user = match tokio::time::timeout(self.lookup_timeout, self.users.find_by_id(user_id))
            .await
        {
            Ok(Ok(Some(user))) => user,
            Ok(Ok(None)) => {
                tracing::debug!(user_id, "session names an unknown user");
                return Identity::Anonymous;
            }
            Ok(Err(err)) => {
                tracing::warn!(user_id, error = %err, "user lookup failed; continuing anonymously");
                return Identity::Anonymous;
            }
            Err(_) => {
                tracing::warn!(user_id, "user lookup timed out; continuing anonymously");
                return Identity::Anonymous;
            }
        };

        if !user.is_active {
            tracing::debug!(user_id, "session names an inactive user");
            return Identity::Anonymous;
        }

        let session_hash = session.get(SESSION_USER_HASH_KEY).await;
        if session_hash.as_ref().and_then(Value::as_str) != Some(user.session_auth_hash.as_str()) {
            tracing::debug!(user_id, "session hash no longer matches user");
            return Identity::Anonymous;
        }

        Identity::User(user)
    }
}

/// Reads a user id stored either as a string or as a number.
fn parse_user_id(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[async_trait]
impl<H> Handler for AuthMiddleware<H>
where
    H: Handler,
{
    async fn handle(&self, mut scope: ConnectionScope) -> Result<Response, GatewayError> {
        let Some(session) = scope.session().cloned() else {
            return Err(GatewayError::SessionNotAttached);
        };
        let identity = self.resolve(&session).await;
        tracing::debug!(
            user = identity.display_name(),
            authenticated = identity.is_authenticated(),
            "identity attached"
        );
        scope.attach_user(identity);
        self.inner.handle(scope).await
    }
}
