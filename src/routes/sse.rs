use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::{match_service::normalize_code, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/matches/{code}",
    tag = "sse",
    params(("code" = String, Path, description = "Join code of the match")),
    responses(
        (status = 200, description = "Match SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown match")
    )
)]
/// Stream the realtime events of one match, starting with a handshake.
pub async fn match_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let code = normalize_code(&code)?;
    let (receiver, greeting) = sse_service::subscribe_match(&state, &code).await?;
    info!(code = %code, "new match SSE connection");
    Ok(sse_service::to_sse_stream(receiver, code, greeting))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/matches/{code}", get(match_stream))
}
