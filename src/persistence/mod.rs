//! Persistence layer: PostgreSQL sessions and users.
//!
//! Used when `DATABASE_URL` is configured; otherwise the in-memory
//! stores from [`crate::session`] and [`crate::auth`] serve instead.

pub mod models;
pub mod postgres;

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::GatewayError;

pub use postgres::{PostgresSessionStore, PostgresUserDirectory};

/// Opens a connection pool.
///
/// # Errors
///
/// Returns a [`GatewayError::Persistence`] if the database is unreachable
/// within `connect_timeout`.
pub async fn connect(
    url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<PgPool, GatewayError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(connect_timeout)
        .connect(url)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))
}

/// Applies the bundled SQL migrations.
///
/// # Errors
///
/// Returns a [`GatewayError::Persistence`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), GatewayError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| GatewayError::Persistence(e.to_string()))
}
