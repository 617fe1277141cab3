//! Session persistence.
//!
//! [`SessionStore`] is the seam between the session middleware and
//! wherever sessions live. [`MemorySessionStore`] keeps them in process;
//! the PostgreSQL store lives in [`crate::persistence`].

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::GatewayError;

/// Opaque session key carried in the session cookie.
///
/// Always 32 characters of lowercase ASCII letters and digits, so a
/// cookie value that does not have this shape never reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Length of every session key.
    pub const LEN: usize = 32;

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validates an untrusted value (typically a cookie).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == Self::LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        well_formed.then(|| Self(value.to_string()))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session key.
    pub key: SessionKey,
    /// Arbitrary session entries.
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Instant after which the session is no longer valid.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Returns `true` if the record is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Loads a live session. Expired sessions load as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionRecord>, GatewayError>;

    /// Inserts or replaces a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn save(&self, record: SessionRecord) -> Result<(), GatewayError>;

    /// Deletes a session. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn delete(&self, key: &SessionKey) -> Result<(), GatewayError>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, SessionRecord>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every expired session, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut map = self.sessions.write().await;
        let before = map.len();
        map.retain(|_, record| !record.is_expired_at(now));
        before - map.len()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionRecord>, GatewayError> {
        let now = Utc::now();
        let map = self.sessions.read().await;
        Ok(map
            .get(key)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn save(&self, record: SessionRecord) -> Result<(), GatewayError> {
        self.sessions.write().await.insert(record.key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), GatewayError> {
        self.sessions.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(expires_in: Duration) -> SessionRecord {
        SessionRecord {
            key: SessionKey::generate(),
            data: serde_json::Map::new(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn generated_keys_are_well_formed() {
        let key = SessionKey::generate();
        assert_eq!(key.as_str().len(), SessionKey::LEN);
        assert!(SessionKey::parse(key.as_str()).is_some());
        assert_ne!(key, SessionKey::generate());
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(SessionKey::parse("").is_none());
        assert!(SessionKey::parse("short").is_none());
        assert!(SessionKey::parse(&"A".repeat(32)).is_none());
        assert!(SessionKey::parse(&"a;".repeat(16)).is_none());
        assert!(SessionKey::parse(&"a1".repeat(16)).is_some());
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = MemorySessionStore::new();
        let rec = record(Duration::minutes(5));
        let key = rec.key.clone();

        assert!(store.save(rec.clone()).await.is_ok());
        let Ok(Some(loaded)) = store.load(&key).await else {
            panic!("session should load");
        };
        assert_eq!(loaded, rec);
    }

    #[tokio::test]
    async fn expired_sessions_do_not_load() {
        let store = MemorySessionStore::new();
        let rec = record(Duration::seconds(-1));
        let key = rec.key.clone();
        let _ = store.save(rec).await;

        assert!(matches!(store.load(&key).await, Ok(None)));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemorySessionStore::new();
        let rec = record(Duration::minutes(5));
        let key = rec.key.clone();
        let _ = store.save(rec).await;

        assert!(store.delete(&key).await.is_ok());
        assert!(store.delete(&key).await.is_ok());
        assert!(matches!(store.load(&key).await, Ok(None)));
    }
}
