use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::{
    dao::models::{MatchEntity, Team},
    dto::{missions::MissionSummary, phase::VisibleMatchPhase},
    engine::victory,
};

/// Points of one team.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamScore {
    pub team: Team,
    pub total: u32,
}

/// Scoreboard of a match, final once completed.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchScoreboard {
    pub code: String,
    pub phase: VisibleMatchPhase,
    /// Teams in fixed order, bonus included.
    pub teams: Vec<TeamScore>,
    /// Team credited with the victory bonus.
    pub winner: Option<Team>,
    pub bonus_points: Option<u32>,
    pub missions: Vec<MissionSummary>,
}

impl From<&MatchEntity> for MatchScoreboard {
    fn from(value: &MatchEntity) -> Self {
        let teams = victory::team_totals(value)
            .into_iter()
            .map(|(team, total)| TeamScore { team, total })
            .collect();

        Self {
            code: value.code.clone(),
            phase: (&value.phase).into(),
            teams,
            winner: value.victory.as_ref().and_then(|victory| victory.winner),
            bonus_points: value.victory.as_ref().map(|victory| victory.bonus_points),
            missions: value.assignments.iter().map(MissionSummary::from).collect(),
        }
    }
}
