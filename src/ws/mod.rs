//! WebSocket layer: consumers, connection loop, message envelope.
//!
//! [`websocket_urlpatterns`] is the innermost stage of the WebSocket
//! chain. Each route ends in a [`GroupConsumer`] that accepts the
//! handshake and joins the connection to a broadcast group.

pub mod connection;
pub mod consumer;
pub mod messages;
pub mod routing;

pub use connection::{ConnectionContext, SendPolicy};
pub use consumer::{GroupConsumer, GroupSelector};
pub use routing::websocket_urlpatterns;
