//! Group consumer: the innermost handler of the WebSocket chain.

use async_trait::async_trait;
use axum::response::Response;

use super::connection::{ConnectionContext, SendPolicy, run_connection};
use crate::dispatch::{ConnectionScope, Handler, RouteParams, Transport};
use crate::domain::{ChannelLayer, GroupName};
use crate::error::GatewayError;

/// How a consumer derives its group from the matched route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    /// Every connection joins the same group.
    Fixed(&'static str),
    /// The group is `<prefix>_<value of param>`.
    Param {
        /// Group name prefix.
        prefix: &'static str,
        /// Route capture supplying the suffix.
        param: &'static str,
    },
}

impl GroupSelector {
    /// Resolves the group for the captured route parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the capture is missing, and
    /// [`GatewayError::HandshakeRejected`] if the client-supplied value does
    /// not form a valid group name.
    pub fn resolve(&self, params: &RouteParams) -> Result<GroupName, GatewayError> {
        match self {
            Self::Fixed(name) => GroupName::new(*name),
            Self::Param { prefix, param } => {
                let value = params.get(param).ok_or_else(|| {
                    GatewayError::Internal(format!("route capture `{param}` missing"))
                })?;
                GroupName::new(format!("{prefix}_{value}")).map_err(|_| {
                    GatewayError::HandshakeRejected(format!(
                        "`{param}` does not name a valid group"
                    ))
                })
            }
        }
    }
}

/// Accepts the WebSocket handshake and joins the connection to a group.
#[derive(Debug, Clone)]
pub struct GroupConsumer {
    selector: GroupSelector,
    policy: SendPolicy,
    layer: ChannelLayer,
}

impl GroupConsumer {
    /// Creates a consumer publishing through `layer`.
    #[must_use]
    pub fn new(selector: GroupSelector, policy: SendPolicy, layer: ChannelLayer) -> Self {
        Self {
            selector,
            policy,
            layer,
        }
    }

    /// Group selection rule.
    #[must_use]
    pub fn selector(&self) -> &GroupSelector {
        &self.selector
    }

    /// Publishing policy.
    #[must_use]
    pub fn policy(&self) -> SendPolicy {
        self.policy
    }
}

#[async_trait]
impl Handler for GroupConsumer {
    async fn handle(&self, mut scope: ConnectionScope) -> Result<Response, GatewayError> {
        let params = scope
            .route()
            .map(|route| route.params.clone())
            .unwrap_or_default();
        let group = self.selector.resolve(&params)?;
        let identity = scope.user().cloned().unwrap_or_default();

        let Transport::WebSocket(upgrade) = scope.take_transport() else {
            return Err(GatewayError::MissingTransport("websocket"));
        };

        // Subscribe before the upgrade so nothing published during the
        // handshake is missed.
        let event_rx = self.layer.subscribe();

        tracing::info!(
            group = %group,
            user = identity.display_name(),
            client = ?scope.client(),
            "websocket connection accepted"
        );

        let ctx = ConnectionContext {
            group,
            identity,
            policy: self.policy,
            layer: self.layer.clone(),
        };
        Ok(upgrade.on_upgrade(move |socket| run_connection(socket, event_rx, ctx)))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::dispatch::PathPattern;

    fn params(pattern: &str, path: &str) -> RouteParams {
        let Ok(pattern) = PathPattern::parse(pattern) else {
            panic!("valid pattern");
        };
        let Some(params) = pattern.matches(path) else {
            panic!("pattern should match");
        };
        params
    }

    #[test]
    fn fixed_selector_ignores_params() {
        let Ok(group) = GroupSelector::Fixed("lobby").resolve(&RouteParams::default()) else {
            panic!("should resolve");
        };
        assert_eq!(group.as_str(), "lobby");
    }

    #[test]
    fn param_selector_builds_prefixed_name() {
        let selector = GroupSelector::Param {
            prefix: "post",
            param: "post_id",
        };
        let Ok(group) = selector.resolve(&params("ws/posts/<int:post_id>/", "ws/posts/42/")) else {
            panic!("should resolve");
        };
        assert_eq!(group.as_str(), "post_42");
    }

    #[test]
    fn param_selector_missing_capture_is_internal() {
        let selector = GroupSelector::Param {
            prefix: "chat",
            param: "room",
        };
        assert!(matches!(
            selector.resolve(&RouteParams::default()),
            Err(GatewayError::Internal(_))
        ));
    }

    #[test]
    fn oversized_room_is_rejected_handshake() {
        let selector = GroupSelector::Param {
            prefix: "chat",
            param: "room",
        };
        let path = format!("ws/chat/{}/", "a".repeat(120));
        assert!(matches!(
            selector.resolve(&params("ws/chat/<slug:room>/", &path)),
            Err(GatewayError::HandshakeRejected(_))
        ));
    }

    #[tokio::test]
    async fn detached_scope_is_missing_transport() {
        let consumer = GroupConsumer::new(
            GroupSelector::Fixed("lobby"),
            SendPolicy::Anyone,
            ChannelLayer::new(4),
        );
        let scope = ConnectionScope::new("websocket", "/ws/chat/");
        let result = consumer.handle(scope).await;
        assert!(matches!(
            result,
            Err(GatewayError::MissingTransport("websocket"))
        ));
    }
}
