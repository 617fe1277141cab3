//! Shared application state injected into the HTTP handlers.

use std::sync::Arc;

use crate::domain::ChannelLayer;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Name of the settings module the process was configured with.
    pub settings_module: Arc<str>,
    /// WebSocket path patterns, in match order.
    pub websocket_routes: Arc<[String]>,
    /// Channel layer shared with the WebSocket consumers.
    pub channel_layer: ChannelLayer,
}

impl AppState {
    /// Creates the state from its parts.
    #[must_use]
    pub fn new(
        settings_module: impl Into<Arc<str>>,
        websocket_routes: Vec<String>,
        channel_layer: ChannelLayer,
    ) -> Self {
        Self {
            settings_module: settings_module.into(),
            websocket_routes: websocket_routes.into(),
            channel_layer,
        }
    }
}
