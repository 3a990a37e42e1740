use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::dao::{
    match_store::{MatchStore, event_fits},
    models::{EventDefinitionEntity, MatchEntity, MissionDefinitionEntity, PhaseTag},
    storage::{StorageError, StorageResult},
};

/// Process-local store used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct InMemoryMatchStore {
    matches: Arc<DashMap<String, MatchEntity>>,
    missions: Arc<DashMap<String, MissionDefinitionEntity>>,
    events: Arc<DashMap<String, EventDefinitionEntity>>,
}

impl InMemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<T: Clone>(map: &DashMap<String, T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
        let mut entries: Vec<(String, T)> = map
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter().map(|(_, value)| value).collect()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match store.matches.entry(entity.code.clone()) {
                Entry::Occupied(_) => Err(StorageError::conflict(format!(
                    "match code `{}` already in use",
                    entity.code
                ))),
                Entry::Vacant(slot) => {
                    slot.insert(entity);
                    Ok(())
                }
            }
        })
    }

    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { Ok(store.matches.get(&code).map(|entry| entry.value().clone())) })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut stored) = store.matches.get_mut(&entity.code) else {
                return Ok(false);
            };
            if stored.version != expected_version {
                return Ok(false);
            }
            *stored = entity;
            Ok(true)
        })
    }

    fn save_mission_definition(
        &self,
        definition: MissionDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.missions.insert(definition.id.clone(), definition);
            Ok(())
        })
    }

    fn save_event_definition(
        &self,
        definition: EventDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.events.insert(definition.id.clone(), definition);
            Ok(())
        })
    }

    fn list_mission_definitions(
        &self,
        phase: Option<PhaseTag>,
    ) -> BoxFuture<'static, StorageResult<Vec<MissionDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(Self::sorted(&store.missions, |definition| {
                phase.is_none_or(|phase| definition.phase_tag == phase)
            }))
        })
    }

    fn list_event_definitions(
        &self,
        phase: Option<PhaseTag>,
        player_count: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EventDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(Self::sorted(&store.events, |definition| {
                phase.is_none_or(|phase| definition.phase_tag == phase)
                    && event_fits(definition, player_count)
            }))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{match_entity, mission};
    use crate::dao::models::{PlaceholderKind, Tier};
    use crate::state::state_machine::MatchPhase;

    #[tokio::test]
    async fn duplicate_code_is_rejected() {
        let store = InMemoryMatchStore::new();
        store.insert_match(match_entity(MatchPhase::TeamSelect)).await.unwrap();

        match store.insert_match(match_entity(MatchPhase::TeamSelect)).await {
            Err(StorageError::Conflict { .. }) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_requires_matching_version() {
        let store = InMemoryMatchStore::new();
        let entity = match_entity(MatchPhase::TeamSelect);
        store.insert_match(entity.clone()).await.unwrap();

        let mut next = entity.clone();
        next.version = 1;
        next.phase = MatchPhase::Started;
        assert!(store.replace_match(next.clone(), 0).await.unwrap());

        let mut stale = entity.clone();
        stale.version = 1;
        assert!(!store.replace_match(stale, 0).await.unwrap());

        let stored = store.find_match(&entity.code).await.unwrap().unwrap();
        assert_eq!(stored, next);
    }

    #[tokio::test]
    async fn replace_of_unknown_match_fails() {
        let store = InMemoryMatchStore::new();
        let entity = match_entity(MatchPhase::TeamSelect);
        assert!(!store.replace_match(entity, 0).await.unwrap());
    }

    #[tokio::test]
    async fn catalog_listing_filters_by_phase_and_players() {
        let store = InMemoryMatchStore::new();
        store
            .save_mission_definition(mission("b", PhaseTag::Mid, Tier::Easy, PlaceholderKind::None))
            .await
            .unwrap();
        store
            .save_mission_definition(mission("a", PhaseTag::Start, Tier::Easy, PlaceholderKind::None))
            .await
            .unwrap();

        let all = store.list_mission_definitions(None).await.unwrap();
        assert_eq!(all.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        let mid = store.list_mission_definitions(Some(PhaseTag::Mid)).await.unwrap();
        assert_eq!(mid.len(), 1);

        store
            .save_event_definition(EventDefinitionEntity {
                id: "crowd".into(),
                phase_tag: PhaseTag::Late,
                min_players: Some(6),
                duration_seconds: 60,
                points: 200,
                text: "Everyone to the fountain".into(),
            })
            .await
            .unwrap();
        assert!(store.list_event_definitions(None, 4).await.unwrap().is_empty());
        assert_eq!(store.list_event_definitions(Some(PhaseTag::Late), 6).await.unwrap().len(), 1);
    }
}
