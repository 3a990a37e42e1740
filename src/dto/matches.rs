use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        MatchEntity, MatchSettingsEntity, MissionMode, MissionVisibility, PlayerEntity, Team,
    },
    dto::{format_system_time, phase::VisibleMatchPhase, validation::validate_phase_delays},
    state::state_machine::{MatchPhase, ReviewStatus},
};

/// Creator-chosen settings, used both as input and output.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[validate(schema(function = "validate_phase_delays"))]
pub struct MatchSettingsDto {
    /// Upper bound on scheduled events.
    #[validate(range(min = 0, max = 20))]
    pub max_events: u32,
    /// Seconds of effective time before the MID phase.
    #[validate(range(min = 60, max = 3600))]
    pub mid_delay_seconds: u32,
    /// Seconds of effective time before the LATE phase.
    #[validate(range(min = 60, max = 3600))]
    pub late_delay_seconds: u32,
    #[serde(default)]
    pub mission_mode: MissionMode,
    #[serde(default)]
    pub visibility: MissionVisibility,
    #[validate(length(min = 1, max = 64))]
    pub map: String,
    #[serde(default = "default_true")]
    pub victory_bonus_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl From<MatchSettingsEntity> for MatchSettingsDto {
    fn from(value: MatchSettingsEntity) -> Self {
        Self {
            max_events: value.max_events,
            mid_delay_seconds: value.mid_delay_seconds,
            late_delay_seconds: value.late_delay_seconds,
            mission_mode: value.mission_mode,
            visibility: value.visibility,
            map: value.map,
            victory_bonus_enabled: value.victory_bonus_enabled,
        }
    }
}

impl From<MatchSettingsDto> for MatchSettingsEntity {
    fn from(value: MatchSettingsDto) -> Self {
        Self {
            max_events: value.max_events,
            mid_delay_seconds: value.mid_delay_seconds,
            late_delay_seconds: value.late_delay_seconds,
            mission_mode: value.mission_mode,
            visibility: value.visibility,
            map: value.map,
            victory_bonus_enabled: value.victory_bonus_enabled,
        }
    }
}

/// Payload opening a new match lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateMatchRequest {
    /// Display name of the creator.
    #[validate(length(min = 1, max = 32))]
    pub creator_name: String,
    /// Optional settings; server defaults apply when omitted.
    #[validate(nested)]
    #[serde(default)]
    pub settings: Option<MatchSettingsDto>,
}

/// Payload joining an existing lobby.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinMatchRequest {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
}

/// Payload choosing a side in the lobby.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PickTeamRequest {
    pub team: Team,
}

/// Payload resetting a match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequest {
    /// Phase to go back to.
    pub target: ResetTargetDto,
}

/// Phase a reset goes back to.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResetTargetDto {
    /// Lobby; players and teams are kept.
    TeamSelect,
    /// Fresh deal of missions.
    Started,
}

/// Public projection of a participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub team: Team,
}

impl From<&PlayerEntity> for PlayerSummary {
    fn from(value: &PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            team: value.team,
        }
    }
}

/// Public projection of a match.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: Uuid,
    pub code: String,
    pub version: u64,
    pub phase: VisibleMatchPhase,
    /// Player whose missions are being reviewed.
    pub reviewing_player_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub settings: MatchSettingsDto,
    pub players: Vec<PlayerSummary>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&MatchEntity> for MatchSummary {
    fn from(value: &MatchEntity) -> Self {
        let reviewing_player_id = match value.phase {
            MatchPhase::Validating(ReviewStatus::Reviewing { player_index }) => {
                value.playing().nth(player_index).map(|player| player.id)
            }
            _ => None,
        };

        Self {
            id: value.id,
            code: value.code.clone(),
            version: value.version,
            phase: (&value.phase).into(),
            reviewing_player_id,
            creator_id: value.creator_id,
            settings: value.settings.clone().into(),
            players: value.players.iter().map(PlayerSummary::from).collect(),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Returned to a player entering a match: their identity and the match.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub player_id: Uuid,
    /// Secret to send back in the `X-Player-Token` header.
    pub token: String,
    #[serde(rename = "match")]
    pub match_summary: MatchSummary,
}
