use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{phase::VisibleMatchPhase, timeline::EventSnapshot};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE hub.
pub struct ServerEvent {
    /// Match the event belongs to; `None` reaches every stream.
    pub match_code: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(match_code: Option<String>, event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            match_code,
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Whether a stream following `code` should forward this event.
    pub fn concerns(&self, code: &str) -> bool {
        self.match_code.as_deref().is_none_or(|target| target == code)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Match the stream follows.
    pub code: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every write to a match; clients refetch what they display.
pub struct MatchChangedEvent {
    pub code: String,
    pub version: u64,
    pub phase: VisibleMatchPhase,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an event surfaces and the countdown pauses.
pub struct EventAppearedEvent {
    pub code: String,
    pub event: EventSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the active event expires and the countdown resumes.
pub struct EventEndedEvent {
    pub code: String,
    pub event_id: Uuid,
}
