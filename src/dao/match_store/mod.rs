#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{EventDefinitionEntity, MatchEntity, MissionDefinitionEntity, PhaseTag};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for matches and the mission/event catalogs.
///
/// A match is stored as one document keyed by its join code. Writes after
/// creation go through [`MatchStore::replace_match`], which only succeeds when
/// the stored version still equals the version the caller read.
pub trait MatchStore: Send + Sync {
    /// Store a new match. Fails with a conflict when the code is taken.
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a match by join code.
    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Replace a match if its stored version equals `expected_version`.
    ///
    /// Returns `false` when another writer got there first.
    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Insert or update a mission definition.
    fn save_mission_definition(
        &self,
        definition: MissionDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Insert or update an event definition.
    fn save_event_definition(
        &self,
        definition: EventDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Mission definitions, optionally restricted to one phase.
    fn list_mission_definitions(
        &self,
        phase: Option<PhaseTag>,
    ) -> BoxFuture<'static, StorageResult<Vec<MissionDefinitionEntity>>>;
    /// Event definitions usable with `player_count` participants, optionally restricted to one phase.
    fn list_event_definitions(
        &self,
        phase: Option<PhaseTag>,
        player_count: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EventDefinitionEntity>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Whether an event definition can be used with the given number of participants.
pub(crate) fn event_fits(definition: &EventDefinitionEntity, player_count: u32) -> bool {
    definition
        .min_players
        .is_none_or(|min| player_count >= min)
}
