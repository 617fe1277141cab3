//! Authentication context: users, identities and the auth middleware.
//!
//! Identity is derived from two session entries written by [`login`]:
//! the user's primary key and the user's session hash at login time.

pub mod directory;
pub mod identity;
pub mod middleware;

pub use directory::{MemoryUserDirectory, UserDirectory};
pub use identity::{Identity, User};
pub use middleware::AuthMiddleware;

use crate::error::GatewayError;
use crate::session::{SessionHandle, SessionKey};

/// Session entry holding the authenticated user's primary key.
pub const SESSION_USER_ID_KEY: &str = "_auth_user_id";

/// Session entry holding the user's session hash at login time.
pub const SESSION_USER_HASH_KEY: &str = "_auth_user_hash";

/// Records `user` as authenticated in `session` and persists it.
///
/// # Errors
///
/// Returns [`GatewayError::Persistence`] if the session cannot be saved.
pub async fn login(session: &SessionHandle, user: &User) -> Result<SessionKey, GatewayError> {
    session
        .insert(SESSION_USER_ID_KEY, serde_json::Value::from(user.id.to_string()))
        .await;
    session
        .insert(
            SESSION_USER_HASH_KEY,
            serde_json::Value::from(user.session_auth_hash.clone()),
        )
        .await;
    session.save().await
}

/// Ends the authenticated session.
///
/// # Errors
///
/// Returns [`GatewayError::Persistence`] if the session cannot be deleted.
pub async fn logout(session: &SessionHandle) -> Result<(), GatewayError> {
    session.flush().await
}
