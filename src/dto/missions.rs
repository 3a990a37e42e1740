use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{
    MissionAssignmentEntity, MissionDefinitionEntity, MissionOfferEntity, PhaseTag, Tier,
};

/// Mission as shown to a viewer allowed to read it.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MissionSummary {
    pub id: Uuid,
    pub player_id: Uuid,
    pub phase_tag: PhaseTag,
    pub tier: Tier,
    pub points: u32,
    /// Text with names filled in.
    pub text: String,
    pub is_private: bool,
    pub duel_partner_id: Option<Uuid>,
    /// `None` until reviewed.
    pub validated: Option<bool>,
    pub points_earned: u32,
}

impl From<&MissionAssignmentEntity> for MissionSummary {
    fn from(value: &MissionAssignmentEntity) -> Self {
        Self {
            id: value.id,
            player_id: value.player_id,
            phase_tag: value.phase_tag,
            tier: value.tier,
            points: value.points,
            text: value.display_text().to_owned(),
            is_private: value.is_private,
            duel_partner_id: value.duel_partner_id,
            validated: value.validated,
            points_earned: value.points_earned,
        }
    }
}

/// One mission inside a choice-mode offer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfferedMission {
    pub mission_id: String,
    pub tier: Tier,
    pub points: u32,
    /// Raw template; names are filled in once picked.
    pub text: String,
}

impl From<&MissionDefinitionEntity> for OfferedMission {
    fn from(value: &MissionDefinitionEntity) -> Self {
        Self {
            mission_id: value.id.clone(),
            tier: value.tier,
            points: value.points,
            text: value.text_template.clone(),
        }
    }
}

/// Pending choice for one phase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OfferSummary {
    pub phase_tag: PhaseTag,
    pub tier: Tier,
    pub missions: Vec<OfferedMission>,
}

impl From<&MissionOfferEntity> for OfferSummary {
    fn from(value: &MissionOfferEntity) -> Self {
        Self {
            phase_tag: value.phase_tag,
            tier: value.tier,
            missions: value.missions.iter().map(OfferedMission::from).collect(),
        }
    }
}

/// Missions a player may read, plus their own pending offers.
#[derive(Debug, Serialize, ToSchema)]
pub struct MissionBoard {
    pub missions: Vec<MissionSummary>,
    pub offers: Vec<OfferSummary>,
}

/// Payload picking one mission from an offer.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChooseMissionRequest {
    #[validate(length(min = 1, max = 64))]
    pub mission_id: String,
}

/// Payload recording the review outcome of a mission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateMissionRequest {
    /// `true` awards the mission points, `false` awards nothing.
    pub validated: bool,
}
