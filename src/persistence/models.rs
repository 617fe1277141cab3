//! Database rows for sessions and users.

use chrono::{DateTime, Utc};

use crate::auth::User;
use crate::session::{SessionKey, SessionRecord};

/// A row of the `sessions` table.
#[derive(Debug, Clone)]
pub struct SessionRow {
    /// Primary key.
    pub session_key: String,
    /// JSONB session entries.
    pub session_data: serde_json::Value,
    /// Expiry instant.
    pub expire_date: DateTime<Utc>,
}

impl SessionRow {
    /// Converts the row, `None` if the stored key is malformed.
    ///
    /// Non-object `session_data` loads as an empty session.
    #[must_use]
    pub fn into_record(self) -> Option<SessionRecord> {
        let key = SessionKey::parse(&self.session_key)?;
        let data = match self.session_data {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Some(SessionRecord {
            key,
            data,
            expires_at: self.expire_date,
        })
    }
}

/// A row of the `users` table.
#[derive(Debug, Clone)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Active flag.
    pub is_active: bool,
    /// Staff flag.
    pub is_staff: bool,
    /// Current session authentication hash.
    pub session_auth_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            is_active: row.is_active,
            is_staff: row.is_staff,
            session_auth_hash: row.session_auth_hash,
        }
    }
}
