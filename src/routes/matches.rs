use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dao::models::PhaseTag,
    dto::{
        matches::{
            CreateMatchRequest, JoinMatchRequest, MatchSettingsDto, MatchSummary, PickTeamRequest,
            SessionResponse,
        },
        missions::{ChooseMissionRequest, MissionBoard, MissionSummary},
        summary::MatchScoreboard,
    },
    error::AppError,
    routes::extract::PlayerToken,
    services::{match_service, timeline_service},
    state::SharedState,
};

/// Lobby and player-facing match endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches", post(create_match))
        .route("/matches/{code}", get(get_match))
        .route("/matches/{code}/join", post(join_match))
        .route("/matches/{code}/team", put(pick_team))
        .route("/matches/{code}/settings", put(update_settings))
        .route("/matches/{code}/missions", get(missions))
        .route("/matches/{code}/offers/{phase}/choose", post(choose_mission))
        .route("/matches/{code}/summary", get(summary))
}

/// Open a new lobby; the caller becomes its creator.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    request_body = CreateMatchRequest,
    responses(
        (status = 201, description = "Match created", body = SessionResponse),
        (status = 400, description = "Invalid settings"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = match_service::create_match(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Read the public state of a match.
#[utoipa::path(
    get,
    path = "/matches/{code}",
    tag = "matches",
    params(("code" = String, Path, description = "Join code of the match")),
    responses(
        (status = 200, description = "Match", body = MatchSummary),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(match_service::get_match(&state, &code).await?))
}

/// Enter a lobby as a new player.
#[utoipa::path(
    post,
    path = "/matches/{code}/join",
    tag = "matches",
    params(("code" = String, Path, description = "Join code of the match")),
    request_body = JoinMatchRequest,
    responses(
        (status = 201, description = "Joined", body = SessionResponse),
        (status = 409, description = "Lobby closed or name taken")
    )
)]
pub async fn join_match(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinMatchRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = match_service::join_match(&state, &code, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Pick a side while the lobby is open.
#[utoipa::path(
    put,
    path = "/matches/{code}/team",
    tag = "matches",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Token returned when entering the match")
    ),
    request_body = PickTeamRequest,
    responses((status = 200, description = "Team changed", body = MatchSummary))
)]
pub async fn pick_team(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
    Json(payload): Json<PickTeamRequest>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        match_service::pick_team(&state, &code, &token, payload.team).await?,
    ))
}

/// Replace the match settings (creator only, lobby only).
#[utoipa::path(
    put,
    path = "/matches/{code}/settings",
    tag = "matches",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    request_body = MatchSettingsDto,
    responses(
        (status = 200, description = "Settings saved", body = MatchSummary),
        (status = 400, description = "Invalid settings"),
        (status = 401, description = "Caller is not the creator")
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
    Valid(Json(payload)): Valid<Json<MatchSettingsDto>>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        match_service::update_settings(&state, &code, &token, payload).await?,
    ))
}

/// Missions the caller may read, and their pending offers.
#[utoipa::path(
    get,
    path = "/matches/{code}/missions",
    tag = "missions",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Token returned when entering the match")
    ),
    responses((status = 200, description = "Visible missions", body = MissionBoard))
)]
pub async fn missions(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<MissionBoard>, AppError> {
    Ok(Json(match_service::missions_for(&state, &code, &token).await?))
}

/// Keep one mission out of the caller's offer for a phase.
#[utoipa::path(
    post,
    path = "/matches/{code}/offers/{phase}/choose",
    tag = "missions",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("phase" = PhaseTag, Path, description = "Phase of the offer"),
        ("X-Player-Token" = String, Header, description = "Token returned when entering the match")
    ),
    request_body = ChooseMissionRequest,
    responses(
        (status = 200, description = "Mission kept", body = MissionSummary),
        (status = 404, description = "No pending offer for the phase")
    )
)]
pub async fn choose_mission(
    State(state): State<SharedState>,
    Path((code, phase)): Path<(String, PhaseTag)>,
    PlayerToken(token): PlayerToken,
    Valid(Json(payload)): Valid<Json<ChooseMissionRequest>>,
) -> Result<Json<MissionSummary>, AppError> {
    Ok(Json(
        match_service::choose_mission(&state, &code, &token, phase, &payload.mission_id).await?,
    ))
}

/// Team totals and mission outcomes.
#[utoipa::path(
    get,
    path = "/matches/{code}/summary",
    tag = "matches",
    params(("code" = String, Path, description = "Join code of the match")),
    responses((status = 200, description = "Scoreboard", body = MatchScoreboard))
)]
pub async fn summary(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<MatchScoreboard>, AppError> {
    Ok(Json(timeline_service::scoreboard(&state, &code).await?))
}
