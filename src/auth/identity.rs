//! Users and the per-connection identity derived from them.

use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Inactive users never authenticate.
    pub is_active: bool,
    /// Staff flag, exposed to handlers for their own checks.
    pub is_staff: bool,
    /// Hash a session must carry to stay valid for this user. Changes
    /// when the user's credentials change, invalidating older sessions.
    #[serde(skip_serializing)]
    pub session_auth_hash: String,
}

/// Who is on the other end of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    /// No authenticated user.
    #[default]
    Anonymous,
    /// An authenticated, active user.
    User(User),
}

impl Identity {
    /// Returns `true` for an authenticated user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    /// Name shown to other participants.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::User(user) => &user.username,
            Self::Anonymous => "anonymous",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_default() {
        let identity = Identity::default();
        assert!(!identity.is_authenticated());
        assert!(identity.user().is_none());
        assert_eq!(identity.display_name(), "anonymous");
    }

    #[test]
    fn user_identity_exposes_user() {
        let identity = Identity::User(User {
            id: 1,
            username: "ada".to_string(),
            is_active: true,
            is_staff: false,
            session_auth_hash: "h".to_string(),
        });
        assert!(identity.is_authenticated());
        assert_eq!(identity.display_name(), "ada");
        assert_eq!(identity.user().map(|u| u.id), Some(1));
    }

    #[test]
    fn session_hash_is_not_serialized() {
        let user = User {
            id: 1,
            username: "ada".to_string(),
            is_active: true,
            is_staff: false,
            session_auth_hash: "secret".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap_or_default();
        assert!(!json.contains("secret"));
    }
}
