//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparsable optional values
//! fall back to defaults; the listen address and settings module are the
//! only values whose failure is fatal.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;

/// Settings module used when `SETTINGS_MODULE` is not set.
pub const DEFAULT_SETTINGS_MODULE: &str = "codblog.settings";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// Identifier of the settings profile this process runs with.
    pub settings_module: String,

    /// Name of the cookie carrying the session key.
    pub session_cookie_name: String,

    /// Lifetime of a saved session.
    pub session_ttl: Duration,

    /// Upper bound on a single session or user lookup.
    pub auth_lookup_timeout: Duration,

    /// Capacity of the channel layer broadcast ring.
    pub channel_capacity: usize,

    /// PostgreSQL connection string. `None` selects the in-memory stores.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Tracing output format.
    pub log_format: LogFormat,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed, or if `SETTINGS_MODULE` is set to an empty value.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let settings_module =
            lookup("SETTINGS_MODULE").unwrap_or_else(|| DEFAULT_SETTINGS_MODULE.to_string());
        if settings_module.trim().is_empty() {
            return Err(GatewayError::InvalidConfig(
                "SETTINGS_MODULE must not be empty".to_string(),
            ));
        }

        let session_cookie_name = lookup("SESSION_COOKIE_NAME")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "sessionid".to_string());

        let session_ttl = Duration::from_secs(parse_value(&lookup, "SESSION_TTL_SECS", 1_209_600));
        let auth_lookup_timeout =
            Duration::from_millis(parse_value(&lookup, "AUTH_LOOKUP_TIMEOUT_MS", 2_000));
        let channel_capacity = parse_value(&lookup, "CHANNEL_CAPACITY", 1_024).max(1);

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        let database_max_connections = parse_value(&lookup, "DATABASE_MAX_CONNECTIONS", 10);
        let database_connect_timeout_secs =
            parse_value(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            settings_module,
            session_cookie_name,
            session_ttl,
            auth_lookup_timeout,
            channel_capacity,
            database_url,
            database_max_connections,
            database_connect_timeout_secs,
            log_format,
        })
    }
}

/// Parses a looked-up value as `T`, returning `default` on missing or
/// invalid values.
fn parse_value<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
