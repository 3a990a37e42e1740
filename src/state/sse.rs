use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out channel for every match stream. Receivers keep only the events
/// whose [`ServerEvent::concerns`] matches the code they follow.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Number of open streams across all matches.
    pub fn listeners(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish `event`; with nobody listening the event is dropped.
    pub fn publish(&self, event: ServerEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("no SSE listener for event");
        }
    }
}
