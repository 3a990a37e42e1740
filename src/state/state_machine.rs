use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::MatchEntity;

/// High-level phases a match can be in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Lobby: players join and pick a side.
    TeamSelect,
    /// Missions are dealt; the countdown has not been launched yet.
    Started,
    /// The countdown is running and events fire.
    Running,
    /// The countdown is frozen; nothing fires anymore.
    Stopped,
    /// The creator reviews missions player by player.
    Validating(ReviewStatus),
    /// Scores are final.
    Completed,
}

/// Sub-phase of the validation review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Reviewing the missions of the n-th playing participant.
    Reviewing {
        /// Index into the playing participants, in join order.
        player_index: usize,
    },
    /// Every player was reviewed; the victory bonus is about to be drawn.
    BonusSelection,
}

/// Where a reset sends the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTarget {
    /// Back to the lobby, keeping players and teams.
    TeamSelect,
    /// Restart with freshly dealt missions.
    Started,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// Creator deals missions and leaves the lobby.
    StartMissions,
    /// Creator launches the countdown.
    LaunchCountdown,
    /// Creator freezes the countdown.
    StopCountdown,
    /// Creator opens the validation review.
    BeginValidation,
    /// Move the review to the next player.
    ReviewNext,
    /// All players reviewed; draw the victory bonus.
    OpenBonusSelection,
    /// Finalise scores.
    Complete,
    /// Discard progress and go back to an earlier phase.
    Reset(ResetTarget),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the match was in when the invalid event was received.
    pub from: MatchPhase,
    /// The event that cannot be applied from this phase.
    pub event: MatchEvent,
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// Match phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: MatchPhase,
        /// Current phase.
        actual: MatchPhase,
    },
    /// Match version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: u64,
        /// Current version.
        actual: u64,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan, used in logs.
    pub id: PlanId,
    /// Phase the match is currently in.
    pub from: MatchPhase,
    /// Phase the match will transition to.
    pub to: MatchPhase,
    /// Event that triggered this transition.
    pub event: MatchEvent,
    /// Version the match document carries once the transition is written.
    pub version_next: u64,
}

/// State machine view over one match document.
///
/// The phase lives in the persisted [`MatchEntity`]; the machine only validates
/// events against it and stamps the result back.
#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    phase: MatchPhase,
    version: u64,
}

impl MatchStateMachine {
    /// Machine positioned on the phase and version of a loaded match.
    pub fn for_match(entity: &MatchEntity) -> Self {
        Self {
            phase: entity.phase.clone(),
            version: entity.version,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase.clone()
    }

    /// Validate that the event can be applied from the current phase.
    pub fn plan(&self, event: MatchEvent) -> Result<Plan, InvalidTransition> {
        let next = self.compute_transition(event.clone())?;

        Ok(Plan {
            id: Uuid::new_v4(),
            from: self.phase.clone(),
            to: next,
            event,
            version_next: self.version + 1,
        })
    }

    /// Write a planned transition into the match document about to be stored.
    pub fn apply(plan: &Plan, entity: &mut MatchEntity) -> Result<MatchPhase, ApplyError> {
        if entity.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from.clone(),
                actual: entity.phase.clone(),
            });
        }

        if entity.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: entity.version + 1,
            });
        }

        entity.phase = plan.to.clone();
        entity.version = plan.version_next;

        Ok(entity.phase.clone())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: MatchEvent) -> Result<MatchPhase, InvalidTransition> {
        let next = match (self.phase.clone(), event) {
            (MatchPhase::TeamSelect, MatchEvent::StartMissions) => MatchPhase::Started,
            (MatchPhase::Started, MatchEvent::LaunchCountdown) => MatchPhase::Running,
            (MatchPhase::Running, MatchEvent::StopCountdown) => MatchPhase::Stopped,
            (MatchPhase::Stopped, MatchEvent::BeginValidation) => {
                MatchPhase::Validating(ReviewStatus::Reviewing { player_index: 0 })
            }
            (
                MatchPhase::Validating(ReviewStatus::Reviewing { player_index }),
                MatchEvent::ReviewNext,
            ) => MatchPhase::Validating(ReviewStatus::Reviewing {
                player_index: player_index + 1,
            }),
            (
                MatchPhase::Validating(ReviewStatus::Reviewing { .. }),
                MatchEvent::OpenBonusSelection,
            ) => MatchPhase::Validating(ReviewStatus::BonusSelection),
            (MatchPhase::Validating(_), MatchEvent::Complete) => MatchPhase::Completed,
            (from, MatchEvent::Reset(ResetTarget::TeamSelect)) if from != MatchPhase::TeamSelect => {
                MatchPhase::TeamSelect
            }
            (from, MatchEvent::Reset(ResetTarget::Started)) if from != MatchPhase::TeamSelect => {
                MatchPhase::Started
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
