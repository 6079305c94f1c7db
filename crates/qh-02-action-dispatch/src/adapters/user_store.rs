//! # In-Memory User Store
//!
//! A `UserStore` over a process-local collection with unique indexes on
//! `userID` and `userName`. Reads take a shared lock, so any number of
//! dispatch tasks can look up users concurrently.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::User;
use std::collections::HashMap;
use tracing::info;

use super::store_config::StoreConfig;
use crate::ports::{StoreError, UserStore};

#[derive(Default)]
struct Collection {
    /// Records keyed by `userName`.
    by_user_name: HashMap<String, User>,
    /// `userID` -> `userName`.
    user_ids: HashMap<String, String>,
}

/// Process-local user collection.
pub struct InMemoryUserStore {
    namespace: String,
    users: RwLock<Collection>,
}

impl InMemoryUserStore {
    /// Validate `config` and open the collection it names.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let namespace = format!("{}.{}", config.database, config.collection);
        info!(
            hosts = ?config.hosts,
            namespace = %namespace,
            connection_timeout_ms = config.connection_timeout.as_millis() as u64,
            resource_timeout_ms = config.resource_timeout.as_millis() as u64,
            "In-memory user store ready (indexes: userID_index, userName_index)"
        );

        Ok(Self {
            namespace,
            users: RwLock::new(Collection::default()),
        })
    }

    /// `database.collection` this store serves.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert a record, enforcing both unique indexes.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write();

        if users.by_user_name.contains_key(&user.user_name) {
            return Err(StoreError::Duplicate {
                index: "userName_index",
                value: user.user_name,
            });
        }
        if users.user_ids.contains_key(&user.user_id) {
            return Err(StoreError::Duplicate {
                index: "userID_index",
                value: user.user_id,
            });
        }

        users
            .user_ids
            .insert(user.user_id.clone(), user.user_name.clone());
        users.by_user_name.insert(user.user_name.clone(), user);
        Ok(())
    }

    /// Insert every record, stopping at the first index violation.
    ///
    /// Returns how many records were inserted.
    pub fn seed(&self, users: impl IntoIterator<Item = User>) -> Result<usize, StoreError> {
        let mut inserted = 0;
        for user in users {
            self.insert(user)?;
            inserted += 1;
        }
        Ok(inserted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().by_user_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, user_name: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .by_user_name
            .get(user_name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user_name.to_string()))
    }
}
