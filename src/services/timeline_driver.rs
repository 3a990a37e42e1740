//! Background task ticking the timeline of a running match.

use std::sync::Arc;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    services::timeline_service,
    state::{MatchPhase, SharedState},
};

/// Spawn the driver of a match, replacing any driver already running for it.
///
/// The task holds a weak reference to the state and exits once the match
/// leaves the running phase or disappears.
pub fn spawn(state: &SharedState, code: &str) {
    let weak = Arc::downgrade(state);
    let period = state.config().driver_interval;
    let code = code.to_owned();
    let task_code = code.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(state) = weak.upgrade() else {
                break;
            };

            match timeline_service::advance(&state, &task_code).await {
                Ok((_, entity, _)) if entity.phase != MatchPhase::Running => {
                    debug!(code = %task_code, phase = ?entity.phase, "match left the countdown");
                    state.forget_driver(&task_code);
                    break;
                }
                Ok(_) => {}
                Err(ServiceError::NotFound(_)) => {
                    state.forget_driver(&task_code);
                    break;
                }
                Err(err) => {
                    warn!(code = %task_code, error = %err, "timeline tick failed");
                }
            }
        }
    });

    info!(code = %code, period_ms = period.as_millis() as u64, "timeline driver started");
    state.register_driver(&code, task.abort_handle());
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::{MatchStore, memory::InMemoryMatchStore},
        engine::test_support::match_entity,
        state::AppState,
    };

    async fn state_with(phase: MatchPhase) -> SharedState {
        let mut entity = match_entity(phase);
        entity.start_time = Some(SystemTime::now());
        let store = InMemoryMatchStore::new();
        store.insert_match(entity).await.unwrap();

        let config = AppConfig {
            driver_interval: Duration::from_millis(10),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.set_match_store(Arc::new(store)).await;
        state
    }

    #[tokio::test]
    async fn driver_exits_once_the_match_stops_running() {
        let state = state_with(MatchPhase::Stopped).await;
        spawn(&state, "ABC123");

        for _ in 0..50 {
            if !state.has_driver("ABC123") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!state.has_driver("ABC123"));
    }

    #[tokio::test]
    async fn driver_keeps_running_while_the_countdown_runs() {
        let state = state_with(MatchPhase::Running).await;
        spawn(&state, "ABC123");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(state.has_driver("ABC123"));
        assert_eq!(state.driven_matches(), 1);

        state.abort_driver("ABC123");
        assert!(!state.has_driver("ABC123"));
    }
}
