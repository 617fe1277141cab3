//! Process-wide fan-out of chat traffic.
//!
//! One [`ChannelLayer`] is shared by every consumer. A connection takes a
//! receiver when its handshake is accepted and keeps only the
//! [`GroupEvent`]s addressed to its own group; publishing never waits on
//! slow readers.

use tokio::sync::broadcast;

use super::GroupEvent;

/// Shared handle to the group event stream.
///
/// Cloning is cheap and every clone feeds the same subscribers. A reader
/// that falls more than `capacity` events behind loses the oldest ones and
/// sees [`broadcast::error::RecvError::Lagged`] on its next receive.
#[derive(Debug, Clone)]
pub struct ChannelLayer {
    sender: broadcast::Sender<GroupEvent>,
}

impl ChannelLayer {
    /// Creates a layer buffering up to `capacity` events per reader
    /// (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Hands `event` to every live receiver and reports how many there were.
    /// With nobody listening the event is discarded and `0` is returned.
    pub fn publish(&self, event: GroupEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Opens a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GroupEvent> {
        self.sender.subscribe()
    }

    /// Receivers currently open.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
