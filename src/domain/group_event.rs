//! Events broadcast to the members of a group.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::GroupName;

/// Event published on the [`super::ChannelLayer`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// A participant sent a message.
    Message {
        /// Target group.
        group: GroupName,
        /// Server-assigned message identifier.
        message_id: uuid::Uuid,
        /// Display name of the sender.
        sender: String,
        /// Message body.
        text: String,
        /// Publication timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant connected to the group.
    Joined {
        /// Target group.
        group: GroupName,
        /// Display name of the participant.
        user: String,
        /// Join timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant disconnected from the group.
    Left {
        /// Target group.
        group: GroupName,
        /// Display name of the participant.
        user: String,
        /// Leave timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl GroupEvent {
    /// The group this event is addressed to.
    #[must_use]
    pub fn group(&self) -> &GroupName {
        match self {
            Self::Message { group, .. } | Self::Joined { group, .. } | Self::Left { group, .. } => {
                group
            }
        }
    }

    /// Builds a message event stamped now.
    #[must_use]
    pub fn message(group: GroupName, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Message {
            group,
            message_id: uuid::Uuid::new_v4(),
            sender: sender.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
