//! Domain layer: broadcast groups and the channel layer.
//!
//! Real-time consumers talk to each other only through the
//! [`ChannelLayer`]: a connection publishes [`GroupEvent`]s addressed to
//! a [`GroupName`], and every connection in that group receives them.

pub mod channel_layer;
pub mod group_event;
pub mod group_name;

pub use channel_layer::ChannelLayer;
pub use group_event::GroupEvent;
pub use group_name::GroupName;
