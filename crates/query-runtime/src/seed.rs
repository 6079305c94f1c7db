//! Seed file loading for the user stores.
//!
//! The file is a JSON array of user records in wire form, with `password`
//! holding an Argon2 PHC string.

use async_trait::async_trait;
use qh_02_action_dispatch::{InMemoryUserStore, MongoUserStore, StoreError};
use shared_types::User;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to insert seed user: {0}")]
    Store(#[from] StoreError),
}

/// Read the user records in `path`.
pub fn read_seed_file(path: &Path) -> Result<Vec<User>, SeedError> {
    let raw = std::fs::read(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| SeedError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// A store that accepts seed records.
#[async_trait]
pub trait SeedTarget: Send + Sync {
    /// Write `users`, returning how many were written.
    async fn write_users(&self, users: Vec<User>) -> Result<usize, StoreError>;
}

#[async_trait]
impl SeedTarget for InMemoryUserStore {
    async fn write_users(&self, users: Vec<User>) -> Result<usize, StoreError> {
        self.seed(users)
    }
}

/// Records are upserted by `userID`, so reseeding on restart is idempotent.
#[async_trait]
impl SeedTarget for MongoUserStore {
    async fn write_users(&self, users: Vec<User>) -> Result<usize, StoreError> {
        self.seed(users).await
    }
}

/// Load `path` into `store`. Returns the number of records written.
pub async fn seed_store<S>(store: &S, path: &Path) -> Result<usize, SeedError>
where
    S: SeedTarget + ?Sized,
{
    let users = read_seed_file(path)?;
    let inserted = store.write_users(users).await?;
    info!(path = %path.display(), inserted, "Seeded user store");
    Ok(inserted)
}
