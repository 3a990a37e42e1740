use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{EventDefinitionEntity, MatchEntity, MissionDefinitionEntity};

pub const MATCH_PREFIX: &str = "match::";
pub const MISSION_PREFIX: &str = "mission::";
pub const EVENT_PREFIX: &str = "event::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// CouchDB envelope: document ID and revision around an entity body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    pub fn new(id: String, body: T) -> Self {
        Self { id, rev: None, body }
    }
}

pub type CouchMatchDocument = CouchDocument<MatchEntity>;
pub type CouchMissionDocument = CouchDocument<MissionDefinitionEntity>;
pub type CouchEventDocument = CouchDocument<EventDefinitionEntity>;

pub fn match_doc_id(code: &str) -> String {
    format!("{MATCH_PREFIX}{code}")
}

pub fn mission_doc_id(id: &str) -> String {
    format!("{MISSION_PREFIX}{id}")
}

pub fn event_doc_id(id: &str) -> String {
    format!("{EVENT_PREFIX}{id}")
}
