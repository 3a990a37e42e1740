use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("match code `{code}` already in use")]
    DuplicateMatch { code: String },
    #[error("failed to insert match `{code}`")]
    InsertMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save match `{code}`")]
    SaveMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load match `{code}`")]
    LoadMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to save definition `{id}` in `{collection}`")]
    SaveDefinition {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list definitions in `{collection}`")]
    ListDefinitions {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
}

/// Whether the write failed because the `_id` already exists.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
