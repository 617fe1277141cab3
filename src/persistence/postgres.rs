//! PostgreSQL implementations of the session store and user directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{SessionRow, UserRow};
use crate::auth::{User, UserDirectory};
use crate::error::GatewayError;
use crate::session::{SessionKey, SessionRecord, SessionStore};

/// Session store backed by the `sessions` table.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes every expired session, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Persistence`] on database failure.
    pub async fn purge_expired(&self) -> Result<u64, GatewayError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expire_date <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<Option<SessionRecord>, GatewayError> {
        let row = sqlx::query_as::<_, (String, serde_json::Value, DateTime<Utc>)>(
            "SELECT session_key, session_data, expire_date FROM sessions \
             WHERE session_key = $1 AND expire_date > now()",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(row.and_then(|(session_key, session_data, expire_date)| {
            SessionRow {
                session_key,
                session_data,
                expire_date,
            }
            .into_record()
        }))
    }

    async fn save(&self, record: SessionRecord) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO sessions (session_key, session_data, expire_date) VALUES ($1, $2, $3) \
             ON CONFLICT (session_key) DO UPDATE \
             SET session_data = EXCLUDED.session_data, expire_date = EXCLUDED.expire_date",
        )
        .bind(record.key.as_str())
        .bind(serde_json::Value::Object(record.data))
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), GatewayError> {
        sqlx::query("DELETE FROM sessions WHERE session_key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// User directory backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Creates a directory over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, String, bool, bool, String)>(
            "SELECT id, username, is_active, is_staff, session_auth_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))?;

        Ok(row.map(|(id, username, is_active, is_staff, session_auth_hash)| {
            User::from(UserRow {
                id,
                username,
                is_active,
                is_staff,
                session_auth_hash,
            })
        }))
    }
}
