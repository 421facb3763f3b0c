use crate::domain::analytics::{SessionSnapshot, StreamMessage};
use tokio::sync::broadcast;
use tracing::trace;

/// Fan-out of live analytics updates to any number of subscribers.
///
/// Publishing never blocks the session workers: slow subscribers lag and
/// lose the oldest messages rather than applying backpressure.
#[derive(Clone)]
pub struct StreamBus {
    sender: broadcast::Sender<StreamMessage>,
}

impl StreamBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the message (0 when nobody listens)
    pub fn publish(&self, message: StreamMessage) -> usize {
        let kind = message.kind();
        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("StreamBus: no subscribers for {} message", kind);
                0
            }
        }
    }

    /// Publishes the bar, indicator and collapse-field messages of one update
    pub fn publish_snapshot(&self, snapshot: SessionSnapshot) -> usize {
        snapshot
            .into_messages()
            .into_iter()
            .map(|message| self.publish(message))
            .sum()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StreamBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
