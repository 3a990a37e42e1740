use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::{
    dao::storage::StorageError,
    engine::dealing::DealError,
    state::{ApplyError, InvalidTransition},
};

/// Failures raised by the service layer, independent of HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// No store is installed yet.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Missing token, or a token that does not grant the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The match phase does not allow the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Another writer changed the match first.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The catalog holds too few definitions.
    #[error("exhausted: {0}")]
    Exhausted(String),
    /// The per-match transition gate was not acquired in time.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        let message = match err {
            ApplyError::PhaseMismatch { expected, actual } => {
                format!("match moved from {expected:?} to {actual:?} mid-transition")
            }
            ApplyError::VersionMismatch { expected, actual } => {
                format!("match version is {actual}, transition was planned on {expected}")
            }
        };
        ServiceError::InvalidState(message)
    }
}

impl From<DealError> for ServiceError {
    fn from(err: DealError) -> Self {
        match err {
            DealError::NotEnoughPlayers => ServiceError::InvalidState(err.to_string()),
            DealError::Exhausted { .. } => ServiceError::Exhausted(err.to_string()),
        }
    }
}

/// Errors surfaced by handlers, each tied to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable name sent as `error` in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unprocessable(_) => "unprocessable",
            AppError::ServiceUnavailable(_) => "unavailable",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded | ServiceError::Timeout => {
                AppError::ServiceUnavailable(err.to_string())
            }
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Exhausted(message) => AppError::Unprocessable(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::PhaseTag;

    #[test]
    fn storage_conflict_maps_to_http_conflict() {
        let err: ServiceError = StorageError::conflict("code taken").into();
        let app = AppError::from(err);
        assert_eq!(app.status(), StatusCode::CONFLICT);
        assert_eq!(app.kind(), "conflict");
        assert_eq!(app.to_string(), "code taken");
    }

    #[test]
    fn exhausted_catalog_is_unprocessable() {
        let err: ServiceError = DealError::Exhausted {
            phase: PhaseTag::Late,
            missing: 2,
        }
        .into();
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn gate_timeout_is_unavailable() {
        let app = AppError::from(ServiceError::Timeout);
        assert_eq!(app.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(app.to_string(), "operation timed out");
    }
}
