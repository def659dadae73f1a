//! Typed publish/subscribe bus between the channel and its consumers.
//!
//! Built on tokio broadcast channels. The bus is created by whoever wires
//! the application together and handed to the channel; consumers subscribe
//! to a topic without ever seeing the socket.

use tokio::sync::broadcast;
use tracing::debug;

use crate::events::{ChannelStatus, NoticeEvent};

/// One broadcast topic carrying values of type `T`.
///
/// Publishing never waits on subscribers. A subscriber that falls more
/// than `capacity` events behind gets `RecvError::Lagged` and skips ahead.
#[derive(Debug)]
pub struct Topic<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Topic<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { name, sender }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Send to every current subscriber; returns how many received it.
    pub fn publish(&self, value: T) -> usize {
        match self.sender.send(value) {
            Ok(count) => {
                debug!("published on {} to {count} subscriber(s)", self.name);
                count
            }
            Err(_) => {
                // No receivers; fine during startup/shutdown.
                debug!("no subscribers on {}", self.name);
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// The application's notification bus.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    notices: Topic<NoticeEvent>,
    status: Topic<ChannelStatus>,
}

impl NotificationBus {
    /// Create a bus whose topics each buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            notices: Topic::new("notices", capacity),
            status: Topic::new("status", capacity),
        }
    }

    /// New notices pushed by the server.
    pub fn notices(&self) -> &Topic<NoticeEvent> {
        &self.notices
    }

    /// Connection lifecycle updates.
    pub fn status(&self) -> &Topic<ChannelStatus> {
        &self.status
    }
}
