//! Outbound (Driven) ports for action dispatch.
//!
//! These traits define the collaborators the dispatcher and its actions
//! depend on: the user store and the result id generator.

use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use shared_types::User;
use thiserror::Error;
use uuid::Uuid;

/// Storage collaborator failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record matches the key.
    #[error("no user with userName {0:?}")]
    NotFound(String),

    /// The store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An insert would break a unique index.
    #[error("duplicate value {value:?} for unique index {index}")]
    Duplicate { index: &'static str, value: String },

    /// Connection settings were rejected.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Unique-key lookup over stored user records.
///
/// Implementations must tolerate unbounded concurrent reads.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the single record whose `userName` equals `user_name`.
    async fn find_by_username(&self, user_name: &str) -> Result<User, StoreError>;
}

/// Id generation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("id generation failed: {0}")]
pub struct IdError(pub String);

/// Source of fresh result identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<Uuid, IdError>;
}

/// Random (v4) UUIDs drawn from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngIdGenerator;

impl IdGenerator for OsRngIdGenerator {
    fn generate(&self) -> Result<Uuid, IdError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdError(e.to_string()))?;
        Ok(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}
