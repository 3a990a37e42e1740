use serde::Serialize;
use utoipa::ToSchema;

/// Storage status reported by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// A storage backend is installed and answering.
    Ok,
    /// Running without storage; match routes answer 503.
    Degraded,
}

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Storage status.
    pub status: HealthStatus,
    /// Matches whose countdown is driven by a background task.
    pub driven_matches: usize,
    /// Open SSE streams across all matches.
    pub sse_listeners: usize,
}
