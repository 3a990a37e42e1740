use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::{
        matches::{MatchSummary, ResetRequest},
        missions::{MissionSummary, ValidateMissionRequest},
        summary::MatchScoreboard,
        timeline::{AwardEventRequest, EventSnapshot, TimelineSnapshot},
    },
    error::AppError,
    routes::extract::PlayerToken,
    services::creator_service,
    state::SharedState,
};

/// Endpoints driving a match through its phases; all require the creator token.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches/{code}/start", post(start_match))
        .route("/matches/{code}/launch", post(launch_countdown))
        .route("/matches/{code}/stop", post(stop_countdown))
        .route("/matches/{code}/validation", post(begin_validation))
        .route("/matches/{code}/review/next", post(advance_review))
        .route("/matches/{code}/bonus", post(draw_bonus))
        .route("/matches/{code}/reset", post(reset_match))
        .route(
            "/matches/{code}/missions/{id}/validate",
            post(validate_mission),
        )
        .route("/matches/{code}/events/{id}/award", post(award_event))
}

/// Deal missions and close the lobby.
#[utoipa::path(
    post,
    path = "/matches/{code}/start",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses(
        (status = 200, description = "Missions dealt", body = MatchSummary),
        (status = 409, description = "Already started or a team is empty"),
        (status = 422, description = "Catalog too small for the roster")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(creator_service::start_match(&state, &code, &token).await?))
}

/// Schedule events and start the countdown.
#[utoipa::path(
    post,
    path = "/matches/{code}/launch",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses((status = 200, description = "Countdown running", body = TimelineSnapshot))
)]
pub async fn launch_countdown(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<TimelineSnapshot>, AppError> {
    Ok(Json(
        creator_service::launch_countdown(&state, &code, &token).await?,
    ))
}

/// Freeze the countdown.
#[utoipa::path(
    post,
    path = "/matches/{code}/stop",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses((status = 200, description = "Countdown stopped", body = TimelineSnapshot))
)]
pub async fn stop_countdown(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<TimelineSnapshot>, AppError> {
    Ok(Json(
        creator_service::stop_countdown(&state, &code, &token).await?,
    ))
}

/// Open the review of the first player.
#[utoipa::path(
    post,
    path = "/matches/{code}/validation",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses((status = 200, description = "Review opened", body = MatchSummary))
)]
pub async fn begin_validation(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        creator_service::begin_validation(&state, &code, &token).await?,
    ))
}

/// Accept or reject one mission of the player under review.
#[utoipa::path(
    post,
    path = "/matches/{code}/missions/{id}/validate",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("id" = String, Path, description = "Identifier of the mission assignment"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    request_body = ValidateMissionRequest,
    responses((status = 200, description = "Outcome recorded", body = MissionSummary))
)]
pub async fn validate_mission(
    State(state): State<SharedState>,
    Path((code, id)): Path<(String, Uuid)>,
    PlayerToken(token): PlayerToken,
    Json(payload): Json<ValidateMissionRequest>,
) -> Result<Json<MissionSummary>, AppError> {
    Ok(Json(
        creator_service::validate_mission(&state, &code, &token, id, payload.validated).await?,
    ))
}

/// Move on to the next player, to bonus selection, or to completion.
#[utoipa::path(
    post,
    path = "/matches/{code}/review/next",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses((status = 200, description = "Review advanced", body = MatchSummary))
)]
pub async fn advance_review(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        creator_service::advance_review(&state, &code, &token).await?,
    ))
}

/// Draw the victory bonus and complete the match.
#[utoipa::path(
    post,
    path = "/matches/{code}/bonus",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    responses((status = 200, description = "Final scoreboard", body = MatchScoreboard))
)]
pub async fn draw_bonus(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
) -> Result<Json<MatchScoreboard>, AppError> {
    Ok(Json(creator_service::draw_bonus(&state, &code, &token).await?))
}

/// Credit a surfaced event to a team.
#[utoipa::path(
    post,
    path = "/matches/{code}/events/{id}/award",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("id" = String, Path, description = "Identifier of the scheduled event"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    request_body = AwardEventRequest,
    responses((status = 200, description = "Event awarded", body = EventSnapshot))
)]
pub async fn award_event(
    State(state): State<SharedState>,
    Path((code, id)): Path<(String, Uuid)>,
    PlayerToken(token): PlayerToken,
    Json(payload): Json<AwardEventRequest>,
) -> Result<Json<EventSnapshot>, AppError> {
    Ok(Json(
        creator_service::award_event(&state, &code, &token, id, payload.team).await?,
    ))
}

/// Go back to the lobby or to a fresh deal.
#[utoipa::path(
    post,
    path = "/matches/{code}/reset",
    tag = "creator",
    params(
        ("code" = String, Path, description = "Join code of the match"),
        ("X-Player-Token" = String, Header, description = "Creator token")
    ),
    request_body = ResetRequest,
    responses((status = 200, description = "Match reset", body = MatchSummary))
)]
pub async fn reset_match(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    PlayerToken(token): PlayerToken,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MatchSummary>, AppError> {
    Ok(Json(
        creator_service::reset_match(&state, &code, &token, payload.target).await?,
    ))
}
