use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::{MatchPhase, ReviewStatus};

/// Match phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleMatchPhase {
    /// Players join and pick a side.
    TeamSelect,
    /// Missions dealt, countdown not launched.
    Started,
    /// Countdown running.
    Running,
    /// Countdown frozen.
    Stopped,
    /// Creator reviews missions player by player.
    Reviewing,
    /// Victory bonus about to be drawn.
    BonusSelection,
    /// Scores are final.
    Completed,
}

impl From<&MatchPhase> for VisibleMatchPhase {
    fn from(value: &MatchPhase) -> Self {
        match value {
            MatchPhase::TeamSelect => VisibleMatchPhase::TeamSelect,
            MatchPhase::Started => VisibleMatchPhase::Started,
            MatchPhase::Running => VisibleMatchPhase::Running,
            MatchPhase::Stopped => VisibleMatchPhase::Stopped,
            MatchPhase::Validating(ReviewStatus::Reviewing { .. }) => VisibleMatchPhase::Reviewing,
            MatchPhase::Validating(ReviewStatus::BonusSelection) => {
                VisibleMatchPhase::BonusSelection
            }
            MatchPhase::Completed => VisibleMatchPhase::Completed,
        }
    }
}
