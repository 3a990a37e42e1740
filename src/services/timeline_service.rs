use std::time::SystemTime;

use tracing::debug;

use crate::{
    dao::models::MatchEntity,
    dto::{
        summary::MatchScoreboard,
        timeline::{TickResponse, TimelineSnapshot},
    },
    engine::{
        clock,
        lifecycle::{self, TickOutcome},
    },
    error::ServiceError,
    services::{match_service::normalize_code, sse_events::broadcast_tick},
    state::SharedState,
};

/// Run one lifecycle tick on a match and broadcast what it changed.
///
/// Ticking is idempotent: a tick that finds nothing to do writes nothing.
pub async fn advance(
    state: &SharedState,
    code: &str,
) -> Result<(TickOutcome, MatchEntity, SystemTime), ServiceError> {
    let now = SystemTime::now();
    let (outcome, entity, written) = state
        .update_match(code, |entity| Ok(lifecycle::tick(entity, now)))
        .await?;

    if written {
        debug!(code, expired = ?outcome.expired, appeared = ?outcome.appeared, "timeline advanced");
        broadcast_tick(state, &entity, &outcome, now);
    }
    Ok((outcome, entity, now))
}

/// Tick a match on demand and return its timeline.
pub async fn tick(state: &SharedState, code: &str) -> Result<TickResponse, ServiceError> {
    let code = normalize_code(code)?;
    let (outcome, entity, now) = advance(state, &code).await?;
    Ok(TickResponse {
        changed: outcome.changed(),
        expired: outcome.expired,
        appeared: outcome.appeared,
        timeline: TimelineSnapshot::build(&entity, clock::read(&entity, now), now),
    })
}

/// Read the timeline without advancing it.
pub async fn timeline(state: &SharedState, code: &str) -> Result<TimelineSnapshot, ServiceError> {
    let code = normalize_code(code)?;
    let entity = state.load_match(&code).await?;
    let now = SystemTime::now();
    Ok(TimelineSnapshot::build(&entity, clock::read(&entity, now), now))
}

/// Current team totals and every mission outcome.
pub async fn scoreboard(state: &SharedState, code: &str) -> Result<MatchScoreboard, ServiceError> {
    let code = normalize_code(code)?;
    let entity = state.load_match(&code).await?;
    Ok((&entity).into())
}
