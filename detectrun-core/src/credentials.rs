//! Named credential entries for the scan service.
//!
//! Credentials live outside the run settings in a small JSON store keyed by
//! server id, so settings files can be committed without secrets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("Failed to read credential store: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse credential store: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No credential entry named '{0}'")]
    MissingServer(String),
}

/// Username/password pair for one server entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCredentials {
    pub username: String,
    pub password: String,
}

/// The on-disk credential store: a map of server id to credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerCredentials>,
}

impl CredentialStore {
    /// Loads the store from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CredentialStoreError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Looks up the entry for a server id.
    pub fn get(&self, server_id: &str) -> Result<&ServerCredentials, CredentialStoreError> {
        self.servers
            .get(server_id)
            .ok_or_else(|| CredentialStoreError::MissingServer(server_id.to_string()))
    }
}
