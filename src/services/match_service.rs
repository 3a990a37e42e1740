//! Player-facing match operations: lobby, settings, and mission reads.

use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{MatchEntity, PhaseTag, PlayerEntity, Team},
        storage::StorageError,
    },
    dto::{
        matches::{
            CreateMatchRequest, JoinMatchRequest, MatchSettingsDto, MatchSummary, SessionResponse,
        },
        missions::{MissionBoard, MissionSummary, OfferSummary},
        validation::validate_match_code,
    },
    engine::{clock, dealing, visibility},
    error::ServiceError,
    services::sse_events::broadcast_match_changed,
    state::{SharedState, authorize_creator, state_machine::MatchPhase},
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const MAX_CODE_ATTEMPTS: usize = 5;

/// Uppercase a client-supplied code and reject malformed ones.
pub fn normalize_code(code: &str) -> Result<String, ServiceError> {
    let code = code.trim().to_ascii_uppercase();
    validate_match_code(&code).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.to_string())
                .unwrap_or_else(|| "malformed match code".into()),
        )
    })?;
    Ok(code)
}

fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

fn new_player(name: &str, now: SystemTime) -> PlayerEntity {
    PlayerEntity {
        id: Uuid::new_v4(),
        name: name.trim().to_owned(),
        team: Team::None,
        token: Uuid::new_v4().simple().to_string(),
        joined_at: now,
    }
}

fn ensure_team_select(entity: &MatchEntity) -> Result<(), ServiceError> {
    match entity.phase {
        MatchPhase::TeamSelect => Ok(()),
        ref other => Err(ServiceError::InvalidState(format!(
            "operation requires team selection, current phase {other:?}"
        ))),
    }
}

fn player_for_token<'a>(
    entity: &'a MatchEntity,
    token: &str,
) -> Result<&'a PlayerEntity, ServiceError> {
    entity
        .player_by_token(token)
        .ok_or_else(|| ServiceError::Unauthorized("unknown player token".into()))
}

fn session(player: &PlayerEntity, entity: &MatchEntity) -> SessionResponse {
    SessionResponse {
        player_id: player.id,
        token: player.token.clone(),
        match_summary: entity.into(),
    }
}

/// Open a new lobby with the caller as creator.
pub async fn create_match(
    state: &SharedState,
    request: CreateMatchRequest,
) -> Result<SessionResponse, ServiceError> {
    let store = state.require_match_store().await?;
    let now = SystemTime::now();
    let creator = new_player(&request.creator_name, now);
    let settings = request
        .settings
        .map(Into::into)
        .unwrap_or_else(|| state.config().default_settings.clone());

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = random_code(&mut rand::rng());
        let entity = MatchEntity {
            id: Uuid::new_v4(),
            code: code.clone(),
            version: 0,
            phase: MatchPhase::TeamSelect,
            creator_id: creator.id,
            settings: settings.clone(),
            start_time: None,
            accumulated_pause_seconds: 0,
            pause_anchor: None,
            stopped_at: None,
            players: vec![creator.clone()],
            assignments: Vec::new(),
            offers: Vec::new(),
            events: Vec::new(),
            victory: None,
            created_at: now,
            updated_at: now,
        };

        match store.insert_match(entity.clone()).await {
            Ok(()) => {
                info!(code = %code, creator = %creator.id, "match created");
                return Ok(session(&creator, &entity));
            }
            Err(StorageError::Conflict { .. }) => {
                debug!(code = %code, attempt, "match code already taken; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a free match code".into(),
    ))
}

/// Add a player to a lobby.
pub async fn join_match(
    state: &SharedState,
    code: &str,
    request: JoinMatchRequest,
) -> Result<SessionResponse, ServiceError> {
    let code = normalize_code(code)?;
    let player = new_player(&request.name, SystemTime::now());

    let ((), entity, _) = state
        .update_match(&code, |entity| {
            ensure_team_select(entity)?;
            if entity
                .players
                .iter()
                .any(|existing| existing.name.eq_ignore_ascii_case(&player.name))
            {
                return Err(ServiceError::Conflict(format!(
                    "name `{}` is already taken in this match",
                    player.name
                )));
            }
            entity.players.push(player.clone());
            Ok(())
        })
        .await?;

    info!(code = %code, player = %player.id, "player joined");
    broadcast_match_changed(state, &entity);
    Ok(session(&player, &entity))
}

/// Move the calling player to a side.
pub async fn pick_team(
    state: &SharedState,
    code: &str,
    token: &str,
    team: Team,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let ((), entity, written) = state
        .update_match(&code, |entity| {
            ensure_team_select(entity)?;
            let player_id = player_for_token(entity, token)?.id;
            if let Some(player) = entity.players.iter_mut().find(|p| p.id == player_id) {
                player.team = team;
            }
            Ok(())
        })
        .await?;

    if written {
        broadcast_match_changed(state, &entity);
    }
    Ok((&entity).into())
}

/// Replace the settings of a lobby; creator only.
pub async fn update_settings(
    state: &SharedState,
    code: &str,
    token: &str,
    settings: MatchSettingsDto,
) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let ((), entity, written) = state
        .update_match(&code, |entity| {
            authorize_creator(entity, token)?;
            ensure_team_select(entity)?;
            entity.settings = settings.clone().into();
            Ok(())
        })
        .await?;

    if written {
        broadcast_match_changed(state, &entity);
    }
    Ok((&entity).into())
}

/// Public view of a match.
pub async fn get_match(state: &SharedState, code: &str) -> Result<MatchSummary, ServiceError> {
    let code = normalize_code(code)?;
    let entity = state.load_match(&code).await?;
    Ok((&entity).into())
}

/// Missions the calling player may read right now, plus their own pending offers.
pub fn mission_board(entity: &MatchEntity, viewer: &PlayerEntity, now: SystemTime) -> MissionBoard {
    let clock_phase = clock::read(entity, now).phase_tag;
    let missions = entity
        .assignments
        .iter()
        .filter(|assignment| visibility::is_revealed(assignment.phase_tag, &entity.phase, clock_phase))
        .filter(|assignment| {
            entity.player(assignment.player_id).is_some_and(|owner| {
                visibility::can_view(
                    viewer,
                    owner,
                    assignment,
                    entity.settings.visibility,
                    &entity.phase,
                )
            })
        })
        .map(MissionSummary::from)
        .collect();

    let offers = entity
        .offers
        .iter()
        .filter(|offer| offer.player_id == viewer.id)
        .map(OfferSummary::from)
        .collect();

    MissionBoard { missions, offers }
}

/// Missions visible to the player holding `token`.
pub async fn missions_for(
    state: &SharedState,
    code: &str,
    token: &str,
) -> Result<MissionBoard, ServiceError> {
    let code = normalize_code(code)?;
    let entity = state.load_match(&code).await?;
    let viewer = player_for_token(&entity, token)?;
    Ok(mission_board(&entity, viewer, SystemTime::now()))
}

/// Pick one mission from the caller's offer for `phase`.
pub async fn choose_mission(
    state: &SharedState,
    code: &str,
    token: &str,
    phase: PhaseTag,
    mission_id: &str,
) -> Result<MissionSummary, ServiceError> {
    let code = normalize_code(code)?;
    let (assignment, entity, _) = state
        .update_match(&code, |entity| {
            if !matches!(entity.phase, MatchPhase::Started | MatchPhase::Running) {
                return Err(ServiceError::InvalidState(format!(
                    "missions can only be chosen before the countdown stops, current phase {:?}",
                    entity.phase
                )));
            }
            let holder = player_for_token(entity, token)?.clone();
            let Some(index) = entity
                .offers
                .iter()
                .position(|offer| offer.player_id == holder.id && offer.phase_tag == phase)
            else {
                return Err(ServiceError::NotFound(format!(
                    "no pending {phase:?} offer for this player"
                )));
            };

            let assignment = dealing::accept_offer(
                &entity.offers[index],
                mission_id,
                &holder,
                &entity.players,
                &mut rand::rng(),
            )
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("mission `{mission_id}` was not offered or cannot be picked yet"))
            })?;

            entity.offers.remove(index);
            entity.assignments.push(assignment.clone());
            Ok(assignment)
        })
        .await?;

    debug!(code = %code, mission = mission_id, "offer accepted");
    broadcast_match_changed(state, &entity);
    Ok(MissionSummary::from(&assignment))
}
