//! Storage connection settings shared by the user store adapters.

use std::fmt;
use std::time::Duration;

use crate::ports::StoreError;

/// Connection timeout used when none is configured.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 3000;

/// Per-operation timeout used when none is configured.
pub const DEFAULT_RESOURCE_TIMEOUT_MS: u64 = 5000;

/// Storage connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub hosts: Vec<String>,
    pub username: String,
    pub password: String,
    pub database: String,
    pub collection: String,
    pub connection_timeout: Duration,
    pub resource_timeout: Duration,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("hosts", &self.hosts)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("connection_timeout", &self.connection_timeout)
            .field("resource_timeout", &self.resource_timeout)
            .finish()
    }
}

impl StoreConfig {
    /// Reject settings no store could be opened with.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if self.hosts.iter().all(|host| host.trim().is_empty()) {
            return Err(StoreError::InvalidConfig("no hosts configured".into()));
        }
        if self.database.is_empty() {
            return Err(StoreError::InvalidConfig("database name is empty".into()));
        }
        if self.collection.is_empty() {
            return Err(StoreError::InvalidConfig("collection name is empty".into()));
        }
        Ok(())
    }
}
