use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    EventDefinitionEntity, MatchEntity, MatchSettingsEntity, MissionAssignmentEntity,
    MissionDefinitionEntity, MissionOfferEntity, PhaseTag, PlaceholderKind, PlayerEntity,
    ScheduledEventEntity, Tier, VictoryEntity,
};
use crate::state::state_machine::MatchPhase;

/// Match document keyed by join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    code: String,
    match_id: Uuid,
    version: i64,
    phase: MatchPhase,
    creator_id: Uuid,
    settings: MatchSettingsEntity,
    start_time: Option<DateTime>,
    accumulated_pause_seconds: i64,
    pause_anchor: Option<DateTime>,
    stopped_at: Option<DateTime>,
    players: Vec<PlayerEntity>,
    assignments: Vec<MissionAssignmentEntity>,
    #[serde(default)]
    offers: Vec<MissionOfferEntity>,
    events: Vec<ScheduledEventEntity>,
    victory: Option<VictoryEntity>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            code: value.code,
            match_id: value.id,
            version: value.version as i64,
            phase: value.phase,
            creator_id: value.creator_id,
            settings: value.settings,
            start_time: value.start_time.map(DateTime::from_system_time),
            accumulated_pause_seconds: value.accumulated_pause_seconds as i64,
            pause_anchor: value.pause_anchor.map(DateTime::from_system_time),
            stopped_at: value.stopped_at.map(DateTime::from_system_time),
            players: value.players,
            assignments: value.assignments,
            offers: value.offers,
            events: value.events,
            victory: value.victory,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.match_id,
            code: value.code,
            version: value.version.max(0) as u64,
            phase: value.phase,
            creator_id: value.creator_id,
            settings: value.settings,
            start_time: value.start_time.map(DateTime::to_system_time),
            accumulated_pause_seconds: value.accumulated_pause_seconds.max(0) as u64,
            pause_anchor: value.pause_anchor.map(DateTime::to_system_time),
            stopped_at: value.stopped_at.map(DateTime::to_system_time),
            players: value.players,
            assignments: value.assignments,
            offers: value.offers,
            events: value.events,
            victory: value.victory,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMissionDocument {
    #[serde(rename = "_id")]
    id: String,
    phase_tag: PhaseTag,
    tier: Tier,
    points: u32,
    text_template: String,
    is_private: bool,
    placeholder: PlaceholderKind,
}

impl From<MissionDefinitionEntity> for MongoMissionDocument {
    fn from(value: MissionDefinitionEntity) -> Self {
        Self {
            id: value.id,
            phase_tag: value.phase_tag,
            tier: value.tier,
            points: value.points,
            text_template: value.text_template,
            is_private: value.is_private,
            placeholder: value.placeholder,
        }
    }
}

impl From<MongoMissionDocument> for MissionDefinitionEntity {
    fn from(value: MongoMissionDocument) -> Self {
        Self {
            id: value.id,
            phase_tag: value.phase_tag,
            tier: value.tier,
            points: value.points,
            text_template: value.text_template,
            is_private: value.is_private,
            placeholder: value.placeholder,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEventDocument {
    #[serde(rename = "_id")]
    id: String,
    phase_tag: PhaseTag,
    min_players: Option<u32>,
    duration_seconds: u32,
    points: u32,
    text: String,
}

impl From<EventDefinitionEntity> for MongoEventDocument {
    fn from(value: EventDefinitionEntity) -> Self {
        Self {
            id: value.id,
            phase_tag: value.phase_tag,
            min_players: value.min_players,
            duration_seconds: value.duration_seconds,
            points: value.points,
            text: value.text,
        }
    }
}

impl From<MongoEventDocument> for EventDefinitionEntity {
    fn from(value: MongoEventDocument) -> Self {
        Self {
            id: value.id,
            phase_tag: value.phase_tag,
            min_players: value.min_players,
            duration_seconds: value.duration_seconds,
            points: value.points,
            text: value.text,
        }
    }
}

/// Stored name of a phase tag, matching its serde representation.
fn phase_key(phase: PhaseTag) -> &'static str {
    match phase {
        PhaseTag::Start => "START",
        PhaseTag::Mid => "MID",
        PhaseTag::Late => "LATE",
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

pub fn versioned_id(code: &str, version: u64) -> Document {
    doc! {"_id": code, "version": version as i64}
}

pub fn phase_filter(phase: Option<PhaseTag>) -> Document {
    match phase {
        Some(phase) => doc! {"phase_tag": phase_key(phase)},
        None => doc! {},
    }
}

pub fn event_filter(phase: Option<PhaseTag>, player_count: u32) -> Document {
    let mut filter = phase_filter(phase);
    filter.insert(
        "$or",
        vec![
            doc! {"min_players": null},
            doc! {"min_players": {"$lte": i64::from(player_count)}},
        ],
    );
    filter
}
