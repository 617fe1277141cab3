//! WebSocket URL table.

use super::connection::SendPolicy;
use super::consumer::{GroupConsumer, GroupSelector};
use crate::dispatch::{PathPattern, UrlRouter};
use crate::domain::ChannelLayer;
use crate::error::GatewayError;

/// Builds the router for every WebSocket endpoint.
///
/// | Pattern                    | Group          | Who may send   |
/// |----------------------------|----------------|----------------|
/// | `ws/chat/`                 | `lobby`        | anyone         |
/// | `ws/chat/<slug:room>/`     | `chat_<room>`  | anyone         |
/// | `ws/posts/<int:post_id>/`  | `post_<id>`    | signed-in user |
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRoute`] if a pattern fails to parse.
pub fn websocket_urlpatterns(layer: &ChannelLayer) -> Result<UrlRouter, GatewayError> {
    Ok(UrlRouter::new()
        .route(
            PathPattern::parse("ws/chat/")?,
            GroupConsumer::new(
                GroupSelector::Fixed("lobby"),
                SendPolicy::Anyone,
                layer.clone(),
            ),
        )
        .route(
            PathPattern::parse("ws/chat/<slug:room>/")?,
            GroupConsumer::new(
                GroupSelector::Param {
                    prefix: "chat",
                    param: "room",
                },
                SendPolicy::Anyone,
                layer.clone(),
            ),
        )
        .route(
            PathPattern::parse("ws/posts/<int:post_id>/")?,
            GroupConsumer::new(
                GroupSelector::Param {
                    prefix: "post",
                    param: "post_id",
                },
                SendPolicy::AuthenticatedOnly,
                layer.clone(),
            ),
        ))
}
