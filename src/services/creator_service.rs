//! Creator-only operations. Every phase change goes through the match state
//! machine and is written with a version check, so two creators racing on the
//! same match never both win.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{
        EventDefinitionEntity, MatchEntity, MissionDefinitionEntity, ScheduledEventEntity, Team,
        VictoryEntity,
    },
    dto::{
        matches::{MatchSummary, ResetTargetDto},
        missions::MissionSummary,
        summary::MatchScoreboard,
        timeline::{EventSnapshot, TimelineSnapshot},
    },
    engine::{clock, dealing, scheduler, victory},
    error::ServiceError,
    services::{match_service::normalize_code, sse_events::broadcast_match_changed, timeline_driver},
    state::{
        SharedState, authorize_creator,
        state_machine::{MatchEvent, MatchPhase, ResetTarget, ReviewStatus},
        transitions::run_transition_with_broadcast,
    },
};

impl From<ResetTargetDto> for ResetTarget {
    fn from(value: ResetTargetDto) -> Self {
        match value {
            ResetTargetDto::TeamSelect => ResetTarget::TeamSelect,
            ResetTargetDto::Started => ResetTarget::Started,
        }
    }
}

async fn mission_catalog(state: &SharedState) -> Result<Vec<MissionDefinitionEntity>, ServiceError> {
    let store = state.require_match_store().await?;
    Ok(store.list_mission_definitions(None).await?)
}

/// Deal fresh missions onto `entity`, replacing any earlier progress.
fn redeal(
    entity: &mut MatchEntity,
    catalog: &[MissionDefinitionEntity],
    choice_size: usize,
) -> Result<(), ServiceError> {
    let deal = dealing::deal(
        &entity.players,
        catalog,
        entity.settings.mission_mode,
        choice_size,
        &mut rand::rng(),
    )?;
    entity.clear_progress();
    entity.assignments = deal.assignments;
    entity.offers = deal.offers;
    Ok(())
}

fn scheduled_events(entity: &MatchEntity, catalog: &[EventDefinitionEntity]) -> Vec<ScheduledEventEntity> {
    let mut rng = rand::rng();
    let settings = &entity.settings;
    let slots = scheduler::schedule(
        settings.max_events,
        settings.mid_delay_seconds,
        settings.late_delay_seconds,
        &mut rng,
    );
    let player_count = entity.playing().count() as u32;

    scheduler::assign_definitions(&slots, catalog, player_count, &mut rng)
        .into_iter()
        .map(|(slot, definition)| ScheduledEventEntity {
            id: Uuid::new_v4(),
            event_id: definition.id.clone(),
            phase_tag: slot.phase,
            scheduled_at_seconds: slot.scheduled_at,
            duration_seconds: definition.duration_seconds,
            points: definition.points,
            text: definition.text.clone(),
            appeared_at: None,
            ended_at: None,
            winning_team: None,
        })
        .collect()
}

/// Deal missions and leave the lobby.
pub async fn start_match(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let catalog = mission_catalog(state).await?;
    let choice_size = state.config().choice_size;

    let ((), entity) = run_transition_with_broadcast(
        state,
        &code,
        token,
        MatchEvent::StartMissions,
        |entity| redeal(entity, &catalog, choice_size),
    )
    .await?;

    info!(
        code = %code,
        assignments = entity.assignments.len(),
        offers = entity.offers.len(),
        "missions dealt"
    );
    Ok((&entity).into())
}

/// Schedule the events and start the countdown.
pub async fn launch_countdown(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<TimelineSnapshot, ServiceError> {
    let code = normalize_code(code)?;
    let store = state.require_match_store().await?;
    let player_count = state.load_match(&code).await?.playing().count() as u32;
    let catalog = store.list_event_definitions(None, player_count).await?;
    let now = SystemTime::now();

    let ((), entity) = run_transition_with_broadcast(
        state,
        &code,
        token,
        MatchEvent::LaunchCountdown,
        |entity| {
            entity.events = scheduled_events(entity, &catalog);
            entity.start_time = Some(now);
            entity.accumulated_pause_seconds = 0;
            entity.pause_anchor = None;
            entity.stopped_at = None;
            Ok(())
        },
    )
    .await?;

    info!(code = %code, events = entity.events.len(), "countdown launched");
    timeline_driver::spawn(state, &code);
    Ok(TimelineSnapshot::build(&entity, clock::read(&entity, now), now))
}

/// Freeze the countdown. Active events stay as they are.
pub async fn stop_countdown(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<TimelineSnapshot, ServiceError> {
    let code = normalize_code(code)?;
    let now = SystemTime::now();

    let ((), entity) = run_transition_with_broadcast(
        state,
        &code,
        token,
        MatchEvent::StopCountdown,
        |entity| {
            entity.stopped_at = Some(now);
            Ok(())
        },
    )
    .await?;

    state.abort_driver(&code);
    info!(code = %code, "countdown stopped");
    Ok(TimelineSnapshot::build(&entity, clock::read(&entity, now), now))
}

/// Open the player-by-player review.
pub async fn begin_validation(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let ((), entity) =
        run_transition_with_broadcast(state, &code, token, MatchEvent::BeginValidation, |_| Ok(()))
            .await?;
    Ok((&entity).into())
}

/// Record the outcome of one mission of the player under review.
pub async fn validate_mission(
    state: &SharedState,
    code: &str,
    token: &str,
    assignment_id: Uuid,
    validated: bool,
) -> Result<MissionSummary, ServiceError> {
    let code = normalize_code(code)?;
    let (summary, entity, written) = state
        .update_match(&code, |entity| {
            authorize_creator(entity, token)?;
            let MatchPhase::Validating(ReviewStatus::Reviewing { player_index }) = entity.phase
            else {
                return Err(ServiceError::InvalidState(format!(
                    "missions can only be validated during review, current phase {:?}",
                    entity.phase
                )));
            };
            let reviewed = entity
                .playing()
                .nth(player_index)
                .map(|player| player.id)
                .ok_or_else(|| ServiceError::InvalidState("no player under review".into()))?;

            let assignment = entity
                .assignments
                .iter_mut()
                .find(|assignment| assignment.id == assignment_id)
                .ok_or_else(|| ServiceError::NotFound(format!("mission `{assignment_id}` not found")))?;
            if assignment.player_id != reviewed {
                return Err(ServiceError::InvalidInput(
                    "mission does not belong to the player under review".into(),
                ));
            }

            assignment.validated = Some(validated);
            assignment.points_earned = if validated { assignment.points } else { 0 };
            Ok(MissionSummary::from(&*assignment))
        })
        .await?;

    if written {
        broadcast_match_changed(state, &entity);
    }
    Ok(summary)
}

/// Pick the transition that follows the current review step.
fn next_review_event(entity: &MatchEntity) -> Result<MatchEvent, ServiceError> {
    match entity.phase {
        MatchPhase::Validating(ReviewStatus::Reviewing { player_index }) => {
            if player_index + 1 < entity.playing().count() {
                Ok(MatchEvent::ReviewNext)
            } else if entity.settings.victory_bonus_enabled {
                Ok(MatchEvent::OpenBonusSelection)
            } else {
                Ok(MatchEvent::Complete)
            }
        }
        ref other => Err(ServiceError::InvalidState(format!(
            "review is not in progress, current phase {other:?}"
        ))),
    }
}

/// Record the winner without any bonus.
fn settle_without_bonus(entity: &mut MatchEntity) {
    let winner = victory::leader(&victory::team_totals(entity));
    entity.victory = Some(VictoryEntity {
        winner,
        bonus_points: 0,
    });
}

/// Move the review to the next player, to bonus selection, or to completion.
pub async fn advance_review(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let observed = state.load_match(&code).await?;
    let event = next_review_event(&observed)?;
    let completes = event == MatchEvent::Complete;

    let ((), entity) =
        run_transition_with_broadcast(state, &code, token, event, |entity| {
            if entity.phase != observed.phase {
                return Err(ServiceError::Conflict(
                    "review moved on concurrently".into(),
                ));
            }
            if completes {
                settle_without_bonus(entity);
            }
            Ok(())
        })
        .await?;

    debug!(code = %code, phase = ?entity.phase, "review advanced");
    Ok((&entity).into())
}

/// Draw the victory bonus for the leading team and complete the match.
pub async fn draw_bonus(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<MatchScoreboard, ServiceError> {
    let code = normalize_code(code)?;
    let ((), entity) =
        run_transition_with_broadcast(state, &code, token, MatchEvent::Complete, |entity| {
            if entity.phase != MatchPhase::Validating(ReviewStatus::BonusSelection) {
                return Err(ServiceError::InvalidState(
                    "the bonus is drawn once every player was reviewed".into(),
                ));
            }
            let winner = victory::leader(&victory::team_totals(entity));
            let bonus_points = victory::draw_bonus(&mut rand::rng());
            entity.victory = Some(VictoryEntity {
                winner,
                bonus_points,
            });
            Ok(())
        })
        .await?;

    info!(
        code = %code,
        winner = ?entity.victory.as_ref().and_then(|v| v.winner),
        "match completed"
    );
    Ok((&entity).into())
}

/// Credit a surfaced event's points to a team.
pub async fn award_event(
    state: &SharedState,
    code: &str,
    token: &str,
    event_id: Uuid,
    team: Team,
) -> Result<EventSnapshot, ServiceError> {
    let code = normalize_code(code)?;
    if !team.is_playing() {
        return Err(ServiceError::InvalidInput(
            "events can only be awarded to red or blue".into(),
        ));
    }

    let now = SystemTime::now();
    let (snapshot, entity, written) = state
        .update_match(&code, |entity| {
            authorize_creator(entity, token)?;
            if !matches!(
                entity.phase,
                MatchPhase::Running | MatchPhase::Stopped | MatchPhase::Validating(_)
            ) {
                return Err(ServiceError::InvalidState(format!(
                    "events cannot be awarded in phase {:?}",
                    entity.phase
                )));
            }
            let event = entity
                .events
                .iter_mut()
                .find(|event| event.id == event_id)
                .ok_or_else(|| ServiceError::NotFound(format!("event `{event_id}` not found")))?;
            if event.appeared_at.is_none() {
                return Err(ServiceError::InvalidState(
                    "event has not appeared yet".into(),
                ));
            }
            event.winning_team = Some(team);
            Ok(EventSnapshot::at(event, now))
        })
        .await?;

    if written {
        broadcast_match_changed(state, &entity);
    }
    Ok(snapshot)
}

/// Discard progress and go back to the lobby or to a fresh deal.
pub async fn reset_match(
    state: &SharedState,
    code: &str,
    token: &str,
    target: ResetTargetDto,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let target = ResetTarget::from(target);
    let catalog = match target {
        ResetTarget::Started => mission_catalog(state).await?,
        ResetTarget::TeamSelect => Vec::new(),
    };
    let choice_size = state.config().choice_size;

    let ((), entity) = run_transition_with_broadcast(
        state,
        &code,
        token,
        MatchEvent::Reset(target),
        |entity| match target {
            ResetTarget::TeamSelect => {
                entity.clear_progress();
                Ok(())
            }
            ResetTarget::Started => redeal(entity, &catalog, choice_size),
        },
    )
    .await?;

    state.abort_driver(&code);
    info!(code = %code, target = ?target, "match reset");
    Ok((&entity).into())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::{MatchStore, memory::InMemoryMatchStore},
        dao::models::{PhaseTag, PlayerEntity},
        engine::test_support::{match_entity, player},
        services::catalog_service,
        state::AppState,
    };

    struct Fixture {
        state: SharedState,
        creator: PlayerEntity,
        guest: PlayerEntity,
    }

    async fn fixture(phase: MatchPhase) -> Fixture {
        let mut entity = match_entity(phase);
        let creator = entity.players[0].clone();
        let guest = player("blue", Team::Blue);
        entity.players.push(guest.clone());
        entity.players.push(player("red-two", Team::Red));
        entity.players.push(player("blue-two", Team::Blue));

        let config = AppConfig::default();
        let store = InMemoryMatchStore::new();
        catalog_service::seed(&store, &config).await.unwrap();
        store.insert_match(entity).await.unwrap();

        let state = AppState::new(config);
        state.set_match_store(Arc::new(store)).await;
        Fixture {
            state,
            creator,
            guest,
        }
    }

    #[tokio::test]
    async fn start_deals_three_missions_per_playing_player() {
        let f = fixture(MatchPhase::TeamSelect).await;
        let summary = start_match(&f.state, "ABC123", &f.creator.token).await.unwrap();
        assert_eq!(summary.phase, crate::dto::phase::VisibleMatchPhase::Started);

        let stored = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(stored.assignments.len(), 12);
        for player in stored.playing() {
            let mut phases: Vec<_> = stored
                .assignments
                .iter()
                .filter(|a| a.player_id == player.id)
                .map(|a| a.phase_tag)
                .collect();
            phases.sort();
            assert_eq!(phases, PhaseTag::ALL.to_vec());
        }
    }

    #[tokio::test]
    async fn only_the_creator_starts() {
        let f = fixture(MatchPhase::TeamSelect).await;
        let result = start_match(&f.state, "ABC123", &f.guest.token).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));

        let second = start_match(&f.state, "ABC123", &f.creator.token).await;
        assert!(second.is_ok());
        let duplicate = start_match(&f.state, "ABC123", &f.creator.token).await;
        assert!(matches!(duplicate, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn launch_schedules_events_and_stop_freezes_the_clock() {
        let f = fixture(MatchPhase::Started).await;
        let timeline = launch_countdown(&f.state, "ABC123", &f.creator.token)
            .await
            .unwrap();
        assert!(timeline.clock.started);
        assert!((3..=4).contains(&timeline.upcoming_events));
        assert!(f.state.has_driver("ABC123"));

        let stopped = stop_countdown(&f.state, "ABC123", &f.creator.token)
            .await
            .unwrap();
        assert!(!f.state.has_driver("ABC123"));
        let stored = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(stored.phase, MatchPhase::Stopped);

        let later = clock::read(&stored, SystemTime::now() + Duration::from_secs(600));
        assert_eq!(later.elapsed_seconds, stopped.clock.elapsed_seconds);
    }

    async fn reviewing(f: &Fixture) -> MatchEntity {
        start_match(&f.state, "ABC123", &f.creator.token).await.unwrap();
        launch_countdown(&f.state, "ABC123", &f.creator.token).await.unwrap();
        stop_countdown(&f.state, "ABC123", &f.creator.token).await.unwrap();
        begin_validation(&f.state, "ABC123", &f.creator.token).await.unwrap();
        f.state.load_match("ABC123").await.unwrap()
    }

    #[tokio::test]
    async fn review_walks_every_player_then_draws_the_bonus() {
        let f = fixture(MatchPhase::TeamSelect).await;
        let entity = reviewing(&f).await;
        let playing: Vec<Uuid> = entity.playing().map(|p| p.id).collect();

        for (index, player_id) in playing.iter().enumerate() {
            let stored = f.state.load_match("ABC123").await.unwrap();
            assert_eq!(
                stored.phase,
                MatchPhase::Validating(ReviewStatus::Reviewing { player_index: index })
            );
            for assignment in stored.assignments.iter().filter(|a| a.player_id == *player_id) {
                let validated = *player_id == f.creator.id;
                let summary = validate_mission(
                    &f.state,
                    "ABC123",
                    &f.creator.token,
                    assignment.id,
                    validated,
                )
                .await
                .unwrap();
                assert_eq!(summary.points_earned, if validated { assignment.points } else { 0 });
            }
            advance_review(&f.state, "ABC123", &f.creator.token).await.unwrap();
        }

        let stored = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(stored.phase, MatchPhase::Validating(ReviewStatus::BonusSelection));

        let earned: u32 = stored
            .assignments
            .iter()
            .filter(|a| a.player_id == f.creator.id)
            .map(|a| a.points)
            .sum();

        let board = draw_bonus(&f.state, "ABC123", &f.creator.token).await.unwrap();
        assert_eq!(board.winner, Some(Team::Red));
        let red = board.teams.iter().find(|t| t.team == Team::Red).unwrap();
        assert_eq!(red.total, earned + board.bonus_points.unwrap_or_default());
    }

    #[tokio::test]
    async fn validation_is_limited_to_the_reviewed_player() {
        let f = fixture(MatchPhase::TeamSelect).await;
        let entity = reviewing(&f).await;
        let foreign = entity
            .assignments
            .iter()
            .find(|a| a.player_id == f.guest.id)
            .unwrap();

        let result = validate_mission(&f.state, "ABC123", &f.creator.token, foreign.id, true).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn completing_without_bonus_records_the_leader() {
        let f = fixture(MatchPhase::TeamSelect).await;
        f.state
            .update_match("ABC123", |entity| {
                entity.settings.victory_bonus_enabled = false;
                Ok(())
            })
            .await
            .unwrap();
        let entity = reviewing(&f).await;

        for _ in entity.playing() {
            advance_review(&f.state, "ABC123", &f.creator.token).await.unwrap();
        }
        let stored = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(stored.phase, MatchPhase::Completed);
        assert_eq!(
            stored.victory,
            Some(VictoryEntity {
                winner: None,
                bonus_points: 0
            })
        );
    }

    #[tokio::test]
    async fn awarding_requires_an_appeared_event() {
        let f = fixture(MatchPhase::Started).await;
        launch_countdown(&f.state, "ABC123", &f.creator.token).await.unwrap();
        f.state.abort_driver("ABC123");
        let first = f.state.load_match("ABC123").await.unwrap().events[0].id;

        let early = award_event(&f.state, "ABC123", &f.creator.token, first, Team::Blue).await;
        assert!(matches!(early, Err(ServiceError::InvalidState(_))));

        f.state
            .update_match("ABC123", |entity| {
                entity.events[0].appeared_at = Some(SystemTime::now());
                Ok(())
            })
            .await
            .unwrap();
        let snapshot = award_event(&f.state, "ABC123", &f.creator.token, first, Team::Blue)
            .await
            .unwrap();
        assert_eq!(snapshot.winning_team, Some(Team::Blue));

        let neutral = award_event(&f.state, "ABC123", &f.creator.token, first, Team::None).await;
        assert!(matches!(neutral, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn reset_discards_progress() {
        let f = fixture(MatchPhase::TeamSelect).await;
        reviewing(&f).await;

        reset_match(&f.state, "ABC123", &f.creator.token, ResetTargetDto::Started)
            .await
            .unwrap();
        let restarted = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(restarted.phase, MatchPhase::Started);
        assert_eq!(restarted.assignments.len(), 12);
        assert!(restarted.events.is_empty());
        assert!(restarted.start_time.is_none());
        assert!(restarted.assignments.iter().all(|a| a.validated.is_none()));

        reset_match(&f.state, "ABC123", &f.creator.token, ResetTargetDto::TeamSelect)
            .await
            .unwrap();
        let lobby = f.state.load_match("ABC123").await.unwrap();
        assert_eq!(lobby.phase, MatchPhase::TeamSelect);
        assert!(lobby.assignments.is_empty());
        assert_eq!(lobby.players.len(), 4);
    }
}
