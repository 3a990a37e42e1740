//! Failures of the CouchDB match store.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// No response came back for a request.
    #[error("CouchDB request to `{path}` failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with a status the store does not handle.
    #[error("unexpected CouchDB status {status} for `{path}`")]
    UnexpectedStatus { path: String, status: StatusCode },
    /// The response body was not the expected JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A row of a view did not hold the expected document shape.
    #[error("malformed CouchDB document in `{path}`")]
    MalformedRow {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// The match code is already taken.
    #[error("match `{code}` already exists")]
    MatchExists { code: String },
    /// A catalog definition kept changing under an upsert.
    #[error("catalog document `{doc_id}` was modified concurrently")]
    RevisionConflict { doc_id: String },
}
