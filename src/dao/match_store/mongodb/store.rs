use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::open_database,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        MongoEventDocument, MongoMatchDocument, MongoMissionDocument, doc_id, event_filter,
        phase_filter, versioned_id,
    },
};
use crate::dao::{
    match_store::MatchStore,
    models::{EventDefinitionEntity, MatchEntity, MissionDefinitionEntity, PhaseTag},
    storage::StorageResult,
};

const MATCH_COLLECTION_NAME: &str = "matches";
const MISSION_COLLECTION_NAME: &str = "mission_definitions";
const EVENT_COLLECTION_NAME: &str = "event_definitions";

#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = open_database(&self.config).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = open_database(&config).await?;
        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let missions = self.missions().await;
        let index = IndexModel::builder()
            .keys(doc! {"phase_tag": 1, "tier": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("mission_phase_tier_idx".to_owned()))
                    .build(),
            )
            .build();
        missions
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MISSION_COLLECTION_NAME,
                index: "phase_tag,tier",
                source,
            })?;

        let events = self.events().await;
        let index = IndexModel::builder()
            .keys(doc! {"phase_tag": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("event_phase_idx".to_owned()))
                    .build(),
            )
            .build();
        events
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: EVENT_COLLECTION_NAME,
                index: "phase_tag",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.database.read().await.clone()
    }

    async fn matches(&self) -> Collection<MongoMatchDocument> {
        self.database().await.collection(MATCH_COLLECTION_NAME)
    }

    async fn missions(&self) -> Collection<MongoMissionDocument> {
        self.database().await.collection(MISSION_COLLECTION_NAME)
    }

    async fn events(&self) -> Collection<MongoEventDocument> {
        self.database().await.collection(EVENT_COLLECTION_NAME)
    }

    async fn insert_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let code = entity.code.clone();
        let document: MongoMatchDocument = entity.into();
        match self.matches().await.insert_one(&document).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(MongoDaoError::DuplicateMatch { code }),
            Err(source) => Err(MongoDaoError::InsertMatch { code, source }),
        }
    }

    async fn find_match(&self, code: String) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .matches()
            .await
            .find_one(doc_id(&code))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { code, source })?;
        Ok(document.map(Into::into))
    }

    async fn replace_match(&self, entity: MatchEntity, expected_version: u64) -> MongoResult<bool> {
        let code = entity.code.clone();
        let document: MongoMatchDocument = entity.into();
        let result = self
            .matches()
            .await
            .replace_one(versioned_id(&code, expected_version), &document)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { code, source })?;
        Ok(result.matched_count == 1)
    }

    async fn save_mission(&self, definition: MissionDefinitionEntity) -> MongoResult<()> {
        let id = definition.id.clone();
        let document: MongoMissionDocument = definition.into();
        self.missions()
            .await
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveDefinition {
                collection: MISSION_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn save_event(&self, definition: EventDefinitionEntity) -> MongoResult<()> {
        let id = definition.id.clone();
        let document: MongoEventDocument = definition.into();
        self.events()
            .await
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveDefinition {
                collection: EVENT_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn list_missions(&self, phase: Option<PhaseTag>) -> MongoResult<Vec<MissionDefinitionEntity>> {
        let documents: Vec<MongoMissionDocument> = self
            .missions()
            .await
            .find(phase_filter(phase))
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListDefinitions {
                collection: MISSION_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListDefinitions {
                collection: MISSION_COLLECTION_NAME,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn list_events(
        &self,
        phase: Option<PhaseTag>,
        player_count: u32,
    ) -> MongoResult<Vec<EventDefinitionEntity>> {
        let documents: Vec<MongoEventDocument> = self
            .events()
            .await
            .find(event_filter(phase, player_count))
            .sort(doc! {"_id": 1})
            .await
            .map_err(|source| MongoDaoError::ListDefinitions {
                collection: EVENT_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListDefinitions {
                collection: EVENT_COLLECTION_NAME,
                source,
            })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl MatchStore for MongoMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_match(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        let code = code.to_owned();
        Box::pin(async move { store.find_match(code).await.map_err(Into::into) })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .replace_match(entity, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn save_mission_definition(
        &self,
        definition: MissionDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_mission(definition).await.map_err(Into::into) })
    }

    fn save_event_definition(
        &self,
        definition: EventDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_event(definition).await.map_err(Into::into) })
    }

    fn list_mission_definitions(
        &self,
        phase: Option<PhaseTag>,
    ) -> BoxFuture<'static, StorageResult<Vec<MissionDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_missions(phase).await.map_err(Into::into) })
    }

    fn list_event_definitions(
        &self,
        phase: Option<PhaseTag>,
        player_count: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EventDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_events(phase, player_count)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
