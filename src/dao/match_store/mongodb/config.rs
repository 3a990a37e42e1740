use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const URI_VAR: &str = "MONGO_URI";
const DATABASE_VAR: &str = "MONGO_DB";
const DEFAULT_DATABASE: &str = "mission_rush";

/// Parsed client options plus the database holding matches and catalogs.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Build from `MONGO_URI`; `MONGO_DB` defaults to `mission_rush`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var(URI_VAR)
            .ok()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(MongoDaoError::MissingEnvVar { var: URI_VAR })?;
        let options = ClientOptions::parse(&uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri { uri, source })?;

        Ok(Self {
            options,
            database_name: std::env::var(DATABASE_VAR)
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_owned()),
        })
    }
}
