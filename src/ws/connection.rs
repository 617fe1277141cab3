//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding the events of the
//! connection's group.

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use crate::auth::Identity;
use crate::domain::{ChannelLayer, GroupEvent, GroupName};

/// Longest message body accepted from a client, in characters.
pub const MAX_TEXT_LEN: usize = 4_096;

/// Who may publish to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPolicy {
    /// Anonymous connections may send.
    Anyone,
    /// Anonymous connections are read-only.
    AuthenticatedOnly,
}

impl SendPolicy {
    /// Returns `true` if `identity` may publish under this policy.
    #[must_use]
    pub fn permits(self, identity: &Identity) -> bool {
        match self {
            Self::Anyone => true,
            Self::AuthenticatedOnly => identity.is_authenticated(),
        }
    }
}

/// Everything a connection loop needs besides its socket.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Group this connection belongs to.
    pub group: GroupName,
    /// Identity attached by the auth middleware.
    pub identity: Identity,
    /// Publishing policy of the route.
    pub policy: SendPolicy,
    /// Layer used to publish group events.
    pub layer: ChannelLayer,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events addressed to the connection's group.
/// - Announces the participant on join and on leave.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<GroupEvent>,
    ctx: ConnectionContext,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let user = ctx.identity.display_name().to_string();

    ctx.layer.publish(GroupEvent::Joined {
        group: ctx.group.clone(),
        user: user.clone(),
        timestamp: Utc::now(),
    });

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &ctx);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            // Event from the channel layer
            event = event_rx.recv() => {
                match event {
                    Ok(group_event) => {
                        let Some(json) = event_frame(&group_event, &ctx.group) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, group = %ctx.group, "ws client lagged behind channel layer");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    ctx.layer.publish(GroupEvent::Left {
        group: ctx.group.clone(),
        user: user.clone(),
        timestamp: Utc::now(),
    });
    tracing::debug!(group = %ctx.group, user = %user, "ws connection closed");
}

/// Renders `event` as an outbound `event` frame for a member of `group`.
///
/// Returns `None` for events addressed to another group or that fail to
/// serialize.
#[must_use]
pub fn event_frame(event: &GroupEvent, group: &GroupName) -> Option<String> {
    if event.group() != group {
        return None;
    }
    match serde_json::to_value(event) {
        Ok(payload) => WsMessage::event(payload).to_json(),
        Err(err) => {
            tracing::warn!(error = %err, group = %group, "dropping unserializable group event");
            None
        }
    }
}

/// Handles a text message from the client, returning an optional JSON response.
///
/// A valid `send` command is published to the connection's group before
/// the acknowledgement is returned.
pub fn handle_text_message(text: &str, ctx: &ConnectionContext) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error("", 400, "malformed JSON").to_json();
    };

    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command").to_json();
    }

    match msg.payload.get("command").and_then(|v| v.as_str()) {
        Some("send") => {}
        _ => return WsMessage::error(msg.id, 404, "unknown command").to_json(),
    }

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 400, "invalid send payload").to_json();
    };

    match command {
        WsCommand::Send { text } => {
            let text = text.trim();
            if text.is_empty() {
                return WsMessage::error(msg.id, 422, "message is empty").to_json();
            }
            if text.chars().count() > MAX_TEXT_LEN {
                return WsMessage::error(msg.id, 422, "message is too long").to_json();
            }
            if !ctx.policy.permits(&ctx.identity) {
                return WsMessage::error(msg.id, 401, "authentication required").to_json();
            }

            let event = GroupEvent::message(ctx.group.clone(), ctx.identity.display_name(), text);
            let message_id = match &event {
                GroupEvent::Message { message_id, .. } => message_id.to_string(),
                _ => String::new(),
            };
            let delivered = ctx.layer.publish(event);
            tracing::debug!(group = %ctx.group, delivered, "group message published");

            WsMessage::response(
                msg.id,
                serde_json::json!({
                    "message_id": message_id,
                    "group": ctx.group.as_str(),
                    "delivered_to": delivered,
                }),
            )
            .to_json()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn ctx(identity: Identity, policy: SendPolicy) -> ConnectionContext {
        let Ok(group) = GroupName::new("post_42") else {
            panic!("valid group");
        };
        ConnectionContext {
            group,
            identity,
            policy,
            layer: ChannelLayer::new(16),
        }
    }

    fn ada() -> Identity {
        Identity::User(User {
            id: 7,
            username: "ada".to_string(),
            is_active: true,
            is_staff: false,
            session_auth_hash: "h7".to_string(),
        })
    }

    fn reply(text: &str, ctx: &ConnectionContext) -> serde_json::Value {
        let Some(json) = handle_text_message(text, ctx) else {
            panic!("expected a reply");
        };
        let Ok(value) = serde_json::from_str(&json) else {
            panic!("reply is not JSON");
        };
        value
    }

    fn code(value: &serde_json::Value) -> Option<u64> {
        value
            .pointer("/payload/code")
            .and_then(serde_json::Value::as_u64)
    }

    const SEND_HI: &str = r#"{"id":"c1","type":"command","payload":{"command":"send","text":" hi "}}"#;

    #[test]
    fn malformed_json_is_400() {
        let c = ctx(ada(), SendPolicy::Anyone);
        assert_eq!(code(&reply("not json", &c)), Some(400));
    }

    #[test]
    fn unknown_command_is_404() {
        let c = ctx(ada(), SendPolicy::Anyone);
        let value = reply(
            r#"{"id":"c2","type":"command","payload":{"command":"dance"}}"#,
            &c,
        );
        assert_eq!(code(&value), Some(404));
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some("c2"));
    }

    #[test]
    fn empty_text_is_422() {
        let c = ctx(ada(), SendPolicy::Anyone);
        let value = reply(
            r#"{"id":"c3","type":"command","payload":{"command":"send","text":"   "}}"#,
            &c,
        );
        assert_eq!(code(&value), Some(422));
    }

    #[tokio::test]
    async fn send_publishes_to_group() {
        let c = ctx(ada(), SendPolicy::AuthenticatedOnly);
        let mut rx = c.layer.subscribe();

        let value = reply(SEND_HI, &c);
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("response"));
        assert_eq!(
            value
                .pointer("/payload/delivered_to")
                .and_then(serde_json::Value::as_u64),
            Some(1)
        );

        let Ok(GroupEvent::Message { sender, text, group, .. }) = rx.recv().await else {
            panic!("expected a message event");
        };
        assert_eq!(sender, "ada");
        assert_eq!(text, "hi");
        assert_eq!(group.as_str(), "post_42");
    }

    #[test]
    fn anonymous_send_denied_by_policy() {
        let c = ctx(Identity::Anonymous, SendPolicy::AuthenticatedOnly);
        let mut rx = c.layer.subscribe();
        assert_eq!(code(&reply(SEND_HI, &c)), Some(401));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn anonymous_send_allowed_in_open_group() {
        let c = ctx(Identity::Anonymous, SendPolicy::Anyone);
        let mut rx = c.layer.subscribe();
        let value = reply(SEND_HI, &c);
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("response"));
        assert!(matches!(
            rx.try_recv(),
            Ok(GroupEvent::Message { sender, .. }) if sender == "anonymous"
        ));
    }

    #[test]
    fn event_frame_wraps_own_group_events() {
        let c = ctx(ada(), SendPolicy::Anyone);
        let event = GroupEvent::message(c.group.clone(), "ada", "hi");

        let Some(json) = event_frame(&event, &c.group) else {
            panic!("own group event should be forwarded");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&json) else {
            panic!("frame is not JSON");
        };
        assert_eq!(value.get("type").and_then(|v| v.as_str()), Some("event"));
        assert_eq!(
            value.pointer("/payload/event_type").and_then(|v| v.as_str()),
            Some("message")
        );
        assert_eq!(
            value.pointer("/payload/text").and_then(|v| v.as_str()),
            Some("hi")
        );
    }

    #[test]
    fn event_frame_skips_other_groups() {
        let c = ctx(ada(), SendPolicy::Anyone);
        let Ok(lobby) = GroupName::new("lobby") else {
            panic!("valid group");
        };
        let event = GroupEvent::message(lobby, "ada", "hi");
        assert!(event_frame(&event, &c.group).is_none());
    }
}
