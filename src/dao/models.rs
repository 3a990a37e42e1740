use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::state_machine::MatchPhase;

/// Side a player plays for. `None` marks a spectator who holds no missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Red side.
    Red,
    /// Blue side.
    Blue,
    /// Spectator, not on any side.
    None,
}

impl Team {
    /// The two sides that can score, in display order.
    pub const PLAYING: [Team; 2] = [Team::Red, Team::Blue];

    /// Whether this team takes part in missions and scoring.
    pub fn is_playing(self) -> bool {
        !matches!(self, Team::None)
    }

    /// The opposing side, if this team plays.
    pub fn opponent(self) -> Option<Team> {
        match self {
            Team::Red => Some(Team::Blue),
            Team::Blue => Some(Team::Red),
            Team::None => None,
        }
    }
}

/// Difficulty tier of a mission definition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Worth 100 points.
    Easy,
    /// Worth 200 points.
    Medium,
    /// Worth 300 points.
    Hard,
}

impl Tier {
    /// Every tier, lowest first.
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    /// Fixed point value awarded for a validated mission of this tier.
    pub fn points(self) -> u32 {
        match self {
            Tier::Easy => 100,
            Tier::Medium => 200,
            Tier::Hard => 300,
        }
    }

    /// Position of the tier in [`Tier::ALL`].
    pub fn index(self) -> usize {
        match self {
            Tier::Easy => 0,
            Tier::Medium => 1,
            Tier::Hard => 2,
        }
    }
}

/// Segment of the countdown a mission or event belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseTag {
    /// From launch until the mid delay.
    Start,
    /// From the mid delay until the late delay.
    Mid,
    /// From the late delay until the end of the countdown.
    Late,
}

impl PhaseTag {
    /// Every phase tag in chronological order.
    pub const ALL: [PhaseTag; 3] = [PhaseTag::Start, PhaseTag::Mid, PhaseTag::Late];

    /// Position of the tag in [`PhaseTag::ALL`].
    pub fn index(self) -> usize {
        match self {
            PhaseTag::Start => 0,
            PhaseTag::Mid => 1,
            PhaseTag::Late => 2,
        }
    }
}

/// Which other player a mission text refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    /// Plain text, nothing to substitute.
    None,
    /// A random member of the holder's own team.
    Teammate,
    /// A random member of the opposing team.
    Opponent,
    /// Any other player on a team.
    Any,
    /// Paired with an opponent who receives the same mission.
    Duel,
}

/// How missions reach players when the match starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissionMode {
    /// The balancer assigns one mission per phase.
    #[default]
    Auto,
    /// Players pick one mission out of a small offer per phase.
    Choice,
}

/// Who may read the missions held by other players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissionVisibility {
    /// Every player sees every non-private mission.
    All,
    /// Players see the non-private missions of their own team.
    #[default]
    Team,
    /// Players only see their own missions.
    Hidden,
}

/// Per-match settings chosen by the creator before the match starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSettingsEntity {
    /// Upper bound on the number of scheduled events.
    pub max_events: u32,
    /// Offset (seconds) where the MID phase begins.
    pub mid_delay_seconds: u32,
    /// Offset (seconds) where the LATE phase begins.
    pub late_delay_seconds: u32,
    /// How missions are handed out.
    pub mission_mode: MissionMode,
    /// Who sees other players' missions.
    pub visibility: MissionVisibility,
    /// Free-form name of the play area.
    pub map: String,
    /// Whether a random victory bonus is drawn at the end of validation.
    pub victory_bonus_enabled: bool,
}

/// Participant of a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name, used when resolving mission texts.
    pub name: String,
    /// Side the player is on.
    pub team: Team,
    /// Secret handed to the player's client, sent back on every request.
    pub token: String,
    /// When the player joined the lobby.
    pub joined_at: SystemTime,
}

/// Catalog entry describing a mission players can receive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionDefinitionEntity {
    /// Stable slug identifying the definition across restarts.
    pub id: String,
    /// Phase whose pool this mission belongs to.
    pub phase_tag: PhaseTag,
    /// Difficulty tier.
    pub tier: Tier,
    /// Points awarded on validation.
    pub points: u32,
    /// Text shown to the holder, optionally containing the name token.
    pub text_template: String,
    /// Private missions are never shown to other players.
    pub is_private: bool,
    /// Kind of player the name token refers to.
    pub placeholder: PlaceholderKind,
}

/// Catalog entry describing a timed event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventDefinitionEntity {
    /// Stable slug identifying the definition across restarts.
    pub id: String,
    /// Phase whose slots this event may fill.
    pub phase_tag: PhaseTag,
    /// Minimum number of playing participants required.
    pub min_players: Option<u32>,
    /// How long the event stays active once it appears.
    pub duration_seconds: u32,
    /// Points awarded to the winning team.
    pub points: u32,
    /// Text announced to everyone when the event appears.
    pub text: String,
}

/// Mission handed to a player for one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionAssignmentEntity {
    /// Identifier of the assignment itself.
    pub id: Uuid,
    /// Holder of the mission.
    pub player_id: Uuid,
    /// Catalog definition this assignment was drawn from.
    pub mission_id: String,
    /// Phase the mission belongs to.
    pub phase_tag: PhaseTag,
    /// Tier of the definition.
    pub tier: Tier,
    /// Points awarded on validation.
    pub points: u32,
    /// Template text copied from the definition.
    pub text: String,
    /// Private missions are never shown to other players.
    pub is_private: bool,
    /// Placeholder kind copied from the definition.
    pub placeholder: PlaceholderKind,
    /// Text with the name token substituted, when the template has one.
    pub resolved_text: Option<String>,
    /// Duel partner, for duel missions.
    pub duel_partner_id: Option<Uuid>,
    /// Validation outcome; `None` until the creator reviews it.
    pub validated: Option<bool>,
    /// Points actually earned after validation.
    pub points_earned: u32,
}

impl MissionAssignmentEntity {
    /// Text to display: resolved when available, template otherwise.
    pub fn display_text(&self) -> &str {
        self.resolved_text.as_deref().unwrap_or(&self.text)
    }
}

/// Missions offered to a player in choice mode, awaiting a pick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissionOfferEntity {
    /// Player the offer is addressed to.
    pub player_id: Uuid,
    /// Phase the offered missions belong to.
    pub phase_tag: PhaseTag,
    /// Tier the offer was drawn for.
    pub tier: Tier,
    /// Offered definitions, at most one of which will be kept.
    pub missions: Vec<MissionDefinitionEntity>,
}

/// Event placed on the timeline of a running match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledEventEntity {
    /// Identifier of the instance.
    pub id: Uuid,
    /// Catalog definition this instance was created from.
    pub event_id: String,
    /// Phase slice the instance was placed in.
    pub phase_tag: PhaseTag,
    /// Offset (seconds of effective time) at which the event is due.
    pub scheduled_at_seconds: u32,
    /// Copied from the definition.
    pub duration_seconds: u32,
    /// Copied from the definition.
    pub points: u32,
    /// Copied from the definition.
    pub text: String,
    /// Wall-clock time the event became active.
    pub appeared_at: Option<SystemTime>,
    /// Wall-clock time the event expired.
    pub ended_at: Option<SystemTime>,
    /// Team credited with the event points.
    pub winning_team: Option<Team>,
}

impl ScheduledEventEntity {
    /// Appeared and not yet ended.
    pub fn is_active(&self) -> bool {
        self.appeared_at.is_some() && self.ended_at.is_none()
    }
}

/// Final outcome recorded when validation completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryEntity {
    /// Team holding the most points, `None` on a tie.
    pub winner: Option<Team>,
    /// Random bonus added to the winner's total.
    pub bonus_points: u32,
}

/// Aggregate match document persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Short join code shared with players.
    pub code: String,
    /// Incremented on every write; used for compare-and-swap.
    pub version: u64,
    /// Current lifecycle phase.
    pub phase: MatchPhase,
    /// Player allowed to drive the match.
    pub creator_id: Uuid,
    /// Creator-chosen settings.
    pub settings: MatchSettingsEntity,
    /// Wall-clock time the countdown was launched.
    pub start_time: Option<SystemTime>,
    /// Seconds of completed pauses.
    pub accumulated_pause_seconds: u64,
    /// Start of the pause currently in progress.
    pub pause_anchor: Option<SystemTime>,
    /// Wall-clock time the countdown was stopped.
    pub stopped_at: Option<SystemTime>,
    /// Participants in join order.
    pub players: Vec<PlayerEntity>,
    /// Missions held by players.
    pub assignments: Vec<MissionAssignmentEntity>,
    /// Pending choice-mode offers.
    pub offers: Vec<MissionOfferEntity>,
    /// Timeline instances, ascending by scheduled offset.
    pub events: Vec<ScheduledEventEntity>,
    /// Recorded once validation completes.
    pub victory: Option<VictoryEntity>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time the document was written.
    pub updated_at: SystemTime,
}

impl MatchEntity {
    /// Find a player by identifier.
    pub fn player(&self, id: Uuid) -> Option<&PlayerEntity> {
        self.players.iter().find(|player| player.id == id)
    }

    /// Find a player by their secret token.
    pub fn player_by_token(&self, token: &str) -> Option<&PlayerEntity> {
        self.players.iter().find(|player| player.token == token)
    }

    /// Players on a scoring side, in join order.
    pub fn playing(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.players.iter().filter(|player| player.team.is_playing())
    }

    /// Event currently appeared and not ended.
    pub fn active_event(&self) -> Option<&ScheduledEventEntity> {
        self.events.iter().find(|event| event.is_active())
    }

    /// Drop every assignment, offer, event, and clock field.
    pub fn clear_progress(&mut self) {
        self.assignments.clear();
        self.offers.clear();
        self.events.clear();
        self.start_time = None;
        self.accumulated_pause_seconds = 0;
        self.pause_anchor = None;
        self.stopped_at = None;
        self.victory = None;
    }
}
