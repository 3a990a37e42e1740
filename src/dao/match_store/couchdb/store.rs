use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;

use crate::dao::{
    match_store::{MatchStore, event_fits},
    models::{EventDefinitionEntity, MatchEntity, MissionDefinitionEntity, PhaseTag},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, CouchEventDocument, CouchMatchDocument,
        CouchMissionDocument, END_SUFFIX, EVENT_PREFIX, MISSION_PREFIX, event_doc_id,
        match_doc_id, mission_doc_id,
    },
};

#[derive(Clone)]
pub struct CouchMatchStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchMatchStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::from(config.base_url),
            database: Arc::from(config.database),
            auth: config
                .credentials
                .map(|(user, pass)| (Arc::<str>::from(user), Arc::<str>::from(pass))),
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.authorized(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> CouchResult<Response> {
        builder.send().await.map_err(|source| CouchDaoError::Transport {
            path: path.to_owned(),
            source,
        })
    }

    /// Create the database on first use.
    async fn ensure_database(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self.send(self.authorized(self.client.get(&url)), &url).await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let created = self.send(self.authorized(self.client.put(&url)), &url).await?;
                match created.status() {
                    // 412: created by someone else in the meantime
                    status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => {
                        debug!(database = %self.database, "CouchDB database ready");
                        Ok(())
                    }
                    status => Err(CouchDaoError::UnexpectedStatus { path: url, status }),
                }
            }
            status => Err(CouchDaoError::UnexpectedStatus { path: url, status }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::GET, doc_id), doc_id).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::Decode {
                        path: doc_id.to_owned(),
                        source,
                    }
                })
            }
            status => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_owned(),
                status,
            }),
        }
    }

    /// PUT a document. Returns `false` when CouchDB reports a revision conflict.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<bool>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .send(self.request(Method::PUT, doc_id).json(document), doc_id)
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(CouchDaoError::UnexpectedStatus {
                path: doc_id.to_owned(),
                status,
            }),
        }
    }

    /// Insert or overwrite a catalog document, picking up its current revision.
    async fn upsert_document<T>(&self, doc_id: String, body: T) -> CouchResult<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut document = CouchDocument::new(doc_id.clone(), body);
        if let Some(existing) = self.get_document::<CouchDocument<T>>(&doc_id).await? {
            document.rev = existing.rev;
        }
        if self.put_document(&doc_id, &document).await? {
            Ok(())
        } else {
            Err(CouchDaoError::RevisionConflict { doc_id })
        }
    }

    /// Every document whose ID starts with `prefix`.
    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_owned()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response = self
            .send(self.request(Method::GET, ALL_DOCS).query(&query), ALL_DOCS)
            .await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::UnexpectedStatus {
                path: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let payload = response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::Decode {
                path: ALL_DOCS.to_owned(),
                source,
            })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::MalformedRow {
                    path: ALL_DOCS.to_owned(),
                    source,
                })
            })
            .collect()
    }
}

impl MatchStore for CouchMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = match_doc_id(&entity.code);
            let document = CouchMatchDocument::new(doc_id.clone(), entity);
            if store.put_document(&doc_id, &document).await? {
                Ok(())
            } else {
                Err(CouchDaoError::MatchExists { code: document.body.code }.into())
            }
        })
    }

    fn find_match(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        let doc_id = match_doc_id(code);
        Box::pin(async move {
            let document = store.get_document::<CouchMatchDocument>(&doc_id).await?;
            Ok(document.map(|document| document.body))
        })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = match_doc_id(&entity.code);
            let Some(current) = store.get_document::<CouchMatchDocument>(&doc_id).await? else {
                return Ok(false);
            };
            if current.body.version != expected_version {
                return Ok(false);
            }

            // The stored revision makes the PUT fail if someone wrote in between.
            let mut document = CouchMatchDocument::new(doc_id.clone(), entity);
            document.rev = current.rev;
            Ok(store.put_document(&doc_id, &document).await?)
        })
    }

    fn save_mission_definition(
        &self,
        definition: MissionDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = mission_doc_id(&definition.id);
            store
                .upsert_document(doc_id, definition)
                .await
                .map_err(Into::into)
        })
    }

    fn save_event_definition(
        &self,
        definition: EventDefinitionEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = event_doc_id(&definition.id);
            store
                .upsert_document(doc_id, definition)
                .await
                .map_err(Into::into)
        })
    }

    fn list_mission_definitions(
        &self,
        phase: Option<PhaseTag>,
    ) -> BoxFuture<'static, StorageResult<Vec<MissionDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_documents::<CouchMissionDocument>(MISSION_PREFIX)
                .await?;
            Ok(documents
                .into_iter()
                .map(|document| document.body)
                .filter(|definition| phase.is_none_or(|phase| definition.phase_tag == phase))
                .collect())
        })
    }

    fn list_event_definitions(
        &self,
        phase: Option<PhaseTag>,
        player_count: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<EventDefinitionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents = store
                .list_documents::<CouchEventDocument>(EVENT_PREFIX)
                .await?;
            Ok(documents
                .into_iter()
                .map(|document| document.body)
                .filter(|definition| phase.is_none_or(|phase| definition.phase_tag == phase))
                .filter(|definition| event_fits(definition, player_count))
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .send(store.authorized(store.client.get(&url)), &url)
                .await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::UnexpectedStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
