use crate::{
    dao::models::MatchEntity,
    error::ServiceError,
    services::sse_events::broadcast_match_changed,
    state::{SharedState, state_machine::MatchEvent},
};

/// Execute a creator transition on a match, then broadcast the resulting phase change.
pub async fn run_transition_with_broadcast<F, T>(
    state: &SharedState,
    code: &str,
    token: &str,
    event: MatchEvent,
    work: F,
) -> Result<(T, MatchEntity), ServiceError>
where
    F: FnOnce(&mut MatchEntity) -> Result<T, ServiceError>,
{
    let (value, next) = state.run_transition(code, token, event, work).await?;
    broadcast_match_changed(state, &next);
    Ok((value, next))
}
