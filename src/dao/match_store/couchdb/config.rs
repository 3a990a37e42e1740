use super::error::{CouchDaoError, CouchResult};

const BASE_URL_VAR: &str = "COUCH_BASE_URL";
const DATABASE_VAR: &str = "COUCH_DB";
const USERNAME_VAR: &str = "COUCH_USERNAME";
const PASSWORD_VAR: &str = "COUCH_PASSWORD";
const DEFAULT_DATABASE: &str = "mission_rush";

/// Where the CouchDB match store lives and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    /// Basic-auth user and password, when both are set.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL`, then `COUCH_DB` and the optional credentials.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or(CouchDaoError::MissingEnvVar { var: BASE_URL_VAR })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: lookup(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            credentials: lookup(USERNAME_VAR).zip(lookup(PASSWORD_VAR)),
        })
    }
}
