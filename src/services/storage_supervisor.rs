use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a storage backend installed, entering degraded mode while it is unreachable.
///
/// `connect` is retried with exponential backoff until it yields a store. An
/// installed store is health-checked periodically; on failure it gets a few
/// in-place reconnect attempts before being dropped and connected afresh.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.set_match_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        while watch_health(&state, store.as_ref()).await {}

        state.clear_match_store().await;
        warn!("exhausted storage reconnect attempts; reconnecting from scratch");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// One health round. Returns `false` once the store is beyond repair.
async fn watch_health(state: &SharedState, store: &dyn MatchStore) -> bool {
    if store.health_check().await.is_ok() {
        if state.is_degraded().await {
            info!("storage healthy again; leaving degraded mode");
            state.update_degraded(false).await;
        }
        sleep(HEALTH_POLL_INTERVAL).await;
        return true;
    }

    let mut reconnect_delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                state.update_degraded(false).await;
                sleep(HEALTH_POLL_INTERVAL).await;
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "storage reconnect first attempt failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}
