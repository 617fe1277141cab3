//! Assembly of the process-wide application.
//!
//! ```text
//! ProtocolRouter
//!     ├── http      → HttpApplication
//!     └── websocket → SessionMiddleware
//!                       └── AuthMiddleware
//!                             └── UrlRouter (websocket_urlpatterns)
//! ```

use std::sync::Arc;

use crate::api::HttpApplication;
use crate::app_state::AppState;
use crate::auth::{AuthMiddleware, MemoryUserDirectory, UserDirectory};
use crate::config::GatewayConfig;
use crate::dispatch::{Application, Handler, ProtocolKind, ProtocolRouter};
use crate::domain::ChannelLayer;
use crate::error::GatewayError;
use crate::session::{MemorySessionStore, SessionMiddleware, SessionSettings, SessionStore};
use crate::ws::websocket_urlpatterns;

/// Stores and channels the handler chains depend on.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Session backend.
    pub sessions: Arc<dyn SessionStore>,
    /// User backend.
    pub users: Arc<dyn UserDirectory>,
    /// Group broadcast channel.
    pub channel_layer: ChannelLayer,
}

impl Collaborators {
    /// In-process stores with a fresh channel layer.
    #[must_use]
    pub fn in_memory(channel_capacity: usize) -> Self {
        Self {
            sessions: Arc::new(MemorySessionStore::new()),
            users: Arc::new(MemoryUserDirectory::new()),
            channel_layer: ChannelLayer::new(channel_capacity),
        }
    }
}

/// Session settings derived from the configuration.
#[must_use]
pub fn session_settings(config: &GatewayConfig) -> SessionSettings {
    SessionSettings {
        cookie_name: config.session_cookie_name.clone(),
        ttl: config.session_ttl,
        lookup_timeout: config.auth_lookup_timeout,
    }
}

/// Wraps `inner` so that a session and then a user are attached to the
/// scope before it runs.
pub fn websocket_stack<H>(
    inner: H,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserDirectory>,
    settings: SessionSettings,
) -> SessionMiddleware<AuthMiddleware<H>>
where
    H: Handler + 'static,
{
    let lookup_timeout = settings.lookup_timeout;
    SessionMiddleware::new(
        AuthMiddleware::new(inner, users, lookup_timeout),
        sessions,
        settings,
    )
}

/// Builds the application serving both protocols.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRoute`] if the WebSocket URL table
/// fails to build.
pub fn build_application(
    config: &GatewayConfig,
    collaborators: Collaborators,
) -> Result<Application, GatewayError> {
    let Collaborators {
        sessions,
        users,
        channel_layer,
    } = collaborators;

    let urls = websocket_urlpatterns(&channel_layer)?;
    let state = AppState::new(
        config.settings_module.as_str(),
        urls.patterns(),
        channel_layer,
    );

    tracing::info!(
        settings_module = %config.settings_module,
        websocket_routes = urls.len(),
        "application built"
    );

    let router = ProtocolRouter::new()
        .route(ProtocolKind::Http, HttpApplication::new(state))
        .route(
            ProtocolKind::WebSocket,
            websocket_stack(urls, sessions, users, session_settings(config)),
        );

    Ok(Application::new(router))
}
