use tracing::info;

use crate::{config::AppConfig, dao::match_store::MatchStore, dao::storage::StorageResult};

/// Upsert the configured mission and event catalogs into `store`.
///
/// Definitions are keyed by their slug, so seeding again on every connect is harmless.
pub async fn seed(store: &dyn MatchStore, config: &AppConfig) -> StorageResult<()> {
    for mission in &config.missions {
        store.save_mission_definition(mission.clone()).await?;
    }
    for event in &config.events {
        store.save_event_definition(event.clone()).await?;
    }

    info!(
        missions = config.missions.len(),
        events = config.events.len(),
        "catalog seeded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{match_store::memory::InMemoryMatchStore, models::PhaseTag};

    #[tokio::test]
    async fn seeding_twice_keeps_one_copy() {
        let store = InMemoryMatchStore::new();
        let config = AppConfig::default();
        seed(&store, &config).await.unwrap();
        seed(&store, &config).await.unwrap();

        let missions = store.list_mission_definitions(None).await.unwrap();
        assert_eq!(missions.len(), config.missions.len());
        let late = store
            .list_mission_definitions(Some(PhaseTag::Late))
            .await
            .unwrap();
        assert_eq!(late.len(), 9);
    }
}
