use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

use crate::{
    dto::timeline::{TickResponse, TimelineSnapshot},
    error::AppError,
    services::timeline_service,
    state::SharedState,
};

/// Countdown and event endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/matches/{code}/tick", post(tick))
        .route("/matches/{code}/timeline", get(timeline))
}

/// Advance the event lifecycle now. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/matches/{code}/tick",
    tag = "timeline",
    params(("code" = String, Path, description = "Join code of the match")),
    responses((status = 200, description = "Tick applied", body = TickResponse))
)]
pub async fn tick(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<TickResponse>, AppError> {
    Ok(Json(timeline_service::tick(&state, &code).await?))
}

/// Countdown reading and events that already surfaced.
#[utoipa::path(
    get,
    path = "/matches/{code}/timeline",
    tag = "timeline",
    params(("code" = String, Path, description = "Join code of the match")),
    responses((status = 200, description = "Timeline", body = TimelineSnapshot))
)]
pub async fn timeline(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<TimelineSnapshot>, AppError> {
    Ok(Json(timeline_service::timeline(&state, &code).await?))
}
