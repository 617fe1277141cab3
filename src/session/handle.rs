//! Per-connection session handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::store::{SessionKey, SessionRecord, SessionStore};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct SessionState {
    key: Option<SessionKey>,
    data: Map<String, Value>,
    modified: bool,
}

/// Shared handle to the session of one connection.
///
/// Clones share the same state. Changes stay local until [`save`] writes
/// them back to the store the handle was loaded from.
///
/// [`save`]: SessionHandle::save
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<RwLock<SessionState>>,
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionHandle {
    /// An empty session with no key.
    #[must_use]
    pub fn anonymous(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            store,
            ttl,
        }
    }

    /// A session backed by a loaded record.
    #[must_use]
    pub fn from_record(record: SessionRecord, store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState {
                key: Some(record.key),
                data: record.data,
                modified: false,
            })),
            store,
            ttl,
        }
    }

    /// Current session key, `None` for a session that was never saved.
    pub async fn key(&self) -> Option<SessionKey> {
        self.state.read().await.key.clone()
    }

    /// Reads an entry.
    pub async fn get(&self, name: &str) -> Option<Value> {
        self.state.read().await.data.get(name).cloned()
    }

    /// Writes an entry.
    pub async fn insert(&self, name: impl Into<String> + Send, value: Value) {
        let mut state = self.state.write().await;
        state.data.insert(name.into(), value);
        state.modified = true;
    }

    /// Removes an entry, returning its previous value.
    pub async fn remove(&self, name: &str) -> Option<Value> {
        let mut state = self.state.write().await;
        let previous = state.data.remove(name);
        if previous.is_some() {
            state.modified = true;
        }
        previous
    }

    /// Returns `true` if the session holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.data.is_empty()
    }

    /// Returns `true` if entries changed since load or last save.
    pub async fn is_modified(&self) -> bool {
        self.state.read().await.modified
    }

    /// Persists the session, assigning a fresh key if it has none, and
    /// extends its expiry by the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the store rejects the write.
    pub async fn save(&self) -> Result<SessionKey, GatewayError> {
        let mut state = self.state.write().await;
        let key = state.key.clone().unwrap_or_else(SessionKey::generate);
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| GatewayError::Internal(format!("session ttl out of range: {e}")))?;

        self.store
            .save(SessionRecord {
                key: key.clone(),
                data: state.data.clone(),
                expires_at: Utc::now() + ttl,
            })
            .await?;

        state.key = Some(key.clone());
        state.modified = false;
        Ok(key)
    }

    /// Deletes the session from the store and clears it locally.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the store rejects the delete.
    pub async fn flush(&self) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        if let Some(key) = state.key.take() {
            self.store.delete(&key).await?;
        }
        state.data.clear();
        state.modified = false;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::session::store::MemorySessionStore;

    fn store() -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::new())
    }

    #[tokio::test]
    async fn anonymous_session_is_empty() {
        let handle = SessionHandle::anonymous(store(), Duration::from_secs(60));
        assert!(handle.key().await.is_none());
        assert!(handle.is_empty().await);
        assert!(!handle.is_modified().await);
    }

    #[tokio::test]
    async fn save_assigns_key_and_persists() {
        let backing = store();
        let handle = SessionHandle::anonymous(Arc::clone(&backing) as _, Duration::from_secs(60));
        handle.insert("theme", Value::from("dark")).await;
        assert!(handle.is_modified().await);

        let Ok(key) = handle.save().await else {
            panic!("save should succeed");
        };
        assert_eq!(handle.key().await, Some(key.clone()));
        assert!(!handle.is_modified().await);

        let Ok(Some(record)) = backing.load(&key).await else {
            panic!("record should be stored");
        };
        assert_eq!(record.data.get("theme"), Some(&Value::from("dark")));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let handle = SessionHandle::anonymous(store(), Duration::from_secs(60));
        let other = handle.clone();
        other.insert("k", Value::from(1)).await;
        assert_eq!(handle.get("k").await, Some(Value::from(1)));
        assert_eq!(handle.remove("k").await, Some(Value::from(1)));
        assert!(other.is_empty().await);
    }

    #[tokio::test]
    async fn flush_deletes_record() {
        let backing = store();
        let handle = SessionHandle::anonymous(Arc::clone(&backing) as _, Duration::from_secs(60));
        handle.insert("k", Value::from(true)).await;
        let Ok(key) = handle.save().await else {
            panic!("save should succeed");
        };

        assert!(handle.flush().await.is_ok());
        assert!(handle.key().await.is_none());
        assert!(handle.is_empty().await);
        assert!(matches!(backing.load(&key).await, Ok(None)));
    }
}
