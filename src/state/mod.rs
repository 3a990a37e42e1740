mod sse;
pub mod state_machine;
pub mod transitions;

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use tokio::{
    sync::{Mutex, RwLock, watch},
    task::AbortHandle,
    time::timeout,
};
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    dao::{match_store::MatchStore, models::MatchEntity},
    error::ServiceError,
};

pub use self::sse::SseHub;
pub use self::state_machine::{
    ApplyError, InvalidTransition, MatchEvent, MatchPhase, MatchStateMachine, Plan, PlanId,
    ResetTarget, ReviewStatus,
};

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
/// Compare-and-swap attempts before an update gives up with a conflict.
const MAX_UPDATE_ATTEMPTS: usize = 3;
const SSE_CAPACITY: usize = 64;

/// Central application state: storage handle, SSE hub, and per-match coordination.
pub struct AppState {
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    sse: SseHub,
    degraded: watch::Sender<bool>,
    gates: DashMap<String, Arc<Mutex<()>>>,
    drivers: DashMap<String, AbortHandle>,
    config: Arc<AppConfig>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            match_store: RwLock::new(None),
            sse: SseHub::new(SSE_CAPACITY),
            degraded: degraded_tx,
            gates: DashMap::new(),
            drivers: DashMap::new(),
            config: Arc::new(config),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current match store or [`ServiceError::Degraded`].
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn set_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Broadcast hub feeding every match SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Remember the background driver of a match, aborting any previous one.
    pub fn register_driver(&self, code: &str, handle: AbortHandle) {
        if let Some(previous) = self.drivers.insert(code.to_owned(), handle) {
            previous.abort();
        }
    }

    /// Abort the background driver of a match, if one runs.
    pub fn abort_driver(&self, code: &str) {
        if let Some((_, handle)) = self.drivers.remove(code) {
            debug!(code, "aborting timeline driver");
            handle.abort();
        }
    }

    /// Forget a driver that exited on its own.
    pub fn forget_driver(&self, code: &str) {
        self.drivers.remove(code);
    }

    /// Whether a background driver is registered for the match.
    pub fn has_driver(&self, code: &str) -> bool {
        self.drivers
            .get(code)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Number of matches with a live background driver.
    pub fn driven_matches(&self) -> usize {
        self.drivers
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    fn gate(&self, code: &str) -> Arc<Mutex<()>> {
        self.gates
            .entry(code.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop our handle and forget the gate once nobody else holds or awaits it.
    fn release_gate(&self, code: &str, gate: Arc<Mutex<()>>) {
        drop(gate);
        self.gates.remove_if(code, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Load a match or fail with [`ServiceError::NotFound`].
    pub async fn load_match(&self, code: &str) -> Result<MatchEntity, ServiceError> {
        let store = self.require_match_store().await?;
        store
            .find_match(code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("match `{code}` not found")))
    }

    /// Run a creator-driven state-machine transition on one match.
    ///
    /// The transition is planned against the stored phase, `work` mutates a copy of
    /// the match, the plan is stamped onto the copy, and the copy is written back only
    /// if nobody else wrote in between. Transitions for the same match are serialized
    /// in-process and bounded by the transition timeout.
    pub async fn run_transition<F, T>(
        &self,
        code: &str,
        token: &str,
        event: MatchEvent,
        work: F,
    ) -> Result<(T, MatchEntity), ServiceError>
    where
        F: FnOnce(&mut MatchEntity) -> Result<T, ServiceError>,
    {
        let gate = self.gate(code);
        let guard = gate.lock().await;

        let attempt = async {
            let store = self.require_match_store().await?;
            let current = self.load_match(code).await?;
            authorize_creator(&current, token)?;

            let plan = MatchStateMachine::for_match(&current).plan(event.clone())?;
            let mut next = current.clone();
            let value = work(&mut next)?;
            MatchStateMachine::apply(&plan, &mut next)?;
            next.updated_at = SystemTime::now();

            if !store.replace_match(next.clone(), current.version).await? {
                warn!(
                    code,
                    event = ?event,
                    plan_id = %plan.id,
                    "match changed concurrently; transition rejected"
                );
                return Err(ServiceError::Conflict(format!(
                    "match `{code}` changed concurrently"
                )));
            }

            debug!(code, plan_id = %plan.id, from = ?plan.from, to = ?plan.to, "transition applied");
            Ok((value, next))
        };

        let result = match self.transition_timeout {
            Some(limit) => match timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(code, event = ?event, "transition timed out");
                    Err(ServiceError::Timeout)
                }
            },
            None => attempt.await,
        };

        drop(guard);
        self.release_gate(code, gate);
        result
    }

    /// Apply a phase-preserving mutation with bounded compare-and-swap retries.
    ///
    /// `work` may run several times and must be repeatable. When it leaves the match
    /// untouched nothing is written and the stored copy is returned.
    pub async fn update_match<F, T>(
        &self,
        code: &str,
        mut work: F,
    ) -> Result<(T, MatchEntity, bool), ServiceError>
    where
        F: FnMut(&mut MatchEntity) -> Result<T, ServiceError>,
    {
        let gate = self.gate(code);
        let guard = gate.lock().await;

        let attempt = async {
            let store = self.require_match_store().await?;
            for attempt in 1..=MAX_UPDATE_ATTEMPTS {
                let current = self.load_match(code).await?;
                let mut next = current.clone();
                let value = work(&mut next)?;
                if next == current {
                    return Ok((value, current, false));
                }

                next.version = current.version + 1;
                next.updated_at = SystemTime::now();
                if store.replace_match(next.clone(), current.version).await? {
                    return Ok((value, next, true));
                }
                debug!(code, attempt, "match update lost a race; retrying");
            }

            Err(ServiceError::Conflict(format!(
                "match `{code}` kept changing; gave up after {MAX_UPDATE_ATTEMPTS} attempts"
            )))
        };

        let result = match self.transition_timeout {
            Some(limit) => timeout(limit, attempt)
                .await
                .unwrap_or(Err(ServiceError::Timeout)),
            None => attempt.await,
        };

        drop(guard);
        self.release_gate(code, gate);
        result
    }
}

/// Fail unless `token` belongs to the creator of the match.
pub fn authorize_creator(entity: &MatchEntity, token: &str) -> Result<(), ServiceError> {
    match entity.player_by_token(token) {
        Some(player) if player.id == entity.creator_id => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized(
            "only the match creator can do this".into(),
        )),
        None => Err(ServiceError::Unauthorized("unknown player token".into())),
    }
}
