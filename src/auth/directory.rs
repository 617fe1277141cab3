//! User lookup.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::identity::User;
use crate::error::GatewayError;

/// Source of user records for the auth middleware.
#[async_trait]
pub trait UserDirectory: Send + Sync + fmt::Debug {
    /// Finds a user by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on backend failure.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, GatewayError>;
}

/// In-process user directory.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Removes a user.
    pub async fn remove(&self, id: i64) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, GatewayError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> User {
        User {
            id,
            username: format!("user{id}"),
            is_active: true,
            is_staff: false,
            session_auth_hash: format!("hash{id}"),
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let dir = MemoryUserDirectory::new();
        dir.insert(user(1)).await;
        assert!(matches!(dir.find_by_id(1).await, Ok(Some(u)) if u.username == "user1"));
        assert!(matches!(dir.find_by_id(2).await, Ok(None)));
    }

    #[tokio::test]
    async fn remove_forgets_user() {
        let dir = MemoryUserDirectory::new();
        dir.insert(user(1)).await;
        assert!(dir.remove(1).await.is_some());
        assert!(matches!(dir.find_by_id(1).await, Ok(None)));
    }
}
