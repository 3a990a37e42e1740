use std::time::SystemTime;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    dao::models::MatchEntity,
    dto::{
        sse::{EventAppearedEvent, EventEndedEvent, MatchChangedEvent, ServerEvent, SystemStatus},
        timeline::EventSnapshot,
    },
    engine::lifecycle::TickOutcome,
    state::SharedState,
};

const EVENT_MATCH_CHANGED: &str = "match.changed";
const EVENT_APPEARED: &str = "event.appeared";
const EVENT_ENDED: &str = "event.ended";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Tell every client of the match that it was written; they refetch what they show.
pub fn broadcast_match_changed(state: &SharedState, entity: &MatchEntity) {
    let payload = MatchChangedEvent {
        code: entity.code.clone(),
        version: entity.version,
        phase: (&entity.phase).into(),
    };
    send_match_event(state, &entity.code, EVENT_MATCH_CHANGED, &payload);
}

/// Broadcast what a lifecycle tick changed, expiry first.
pub fn broadcast_tick(state: &SharedState, entity: &MatchEntity, outcome: &TickOutcome, now: SystemTime) {
    if let Some(event_id) = outcome.expired {
        let payload = EventEndedEvent {
            code: entity.code.clone(),
            event_id,
        };
        send_match_event(state, &entity.code, EVENT_ENDED, &payload);
    }

    if let Some(appeared) = outcome
        .appeared
        .and_then(|id| entity.events.iter().find(|event| event.id == id))
    {
        let payload = EventAppearedEvent {
            code: entity.code.clone(),
            event: EventSnapshot::at(appeared, now),
        };
        send_match_event(state, &entity.code, EVENT_APPEARED, &payload);
    }

    if outcome.changed() {
        broadcast_match_changed(state, entity);
    }
}

/// Relay degraded-mode changes to every connected stream until the state is dropped.
pub async fn forward_system_status(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "storage status changed");
        match ServerEvent::json(None, Some(EVENT_SYSTEM_STATUS.to_string()), &SystemStatus { degraded }) {
            Ok(event) => state.sse().publish(event),
            Err(err) => warn!(error = %err, "failed to serialize system status"),
        }
    }
}

fn send_match_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(code.to_string()), Some(event.to_string()), payload) {
        Ok(event) => state.sse().publish(event),
        Err(err) => warn!(event, error = %err, "failed to serialize match SSE payload"),
    }
}
