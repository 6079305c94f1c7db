//! # MongoDB User Store
//!
//! `UserStore` over a MongoDB collection. Connecting pings the server and
//! ensures the unique indexes `userID_index` and `userName_index`, so an
//! unreachable server fails startup instead of the first login.
//!
//! Every operation is bounded by the configured resource timeout.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential, IndexOptions, ReplaceOptions, ServerAddress};
use mongodb::{Client, Collection, IndexModel};
use shared_types::User;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::store_config::StoreConfig;
use crate::ports::{StoreError, UserStore};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

const USER_ID_INDEX: &str = "userID_index";
const USER_NAME_INDEX: &str = "userName_index";

/// Driver options for `config`.
///
/// The connection timeout bounds opening a socket; the resource timeout
/// bounds server selection.
pub fn client_options(config: &StoreConfig) -> Result<ClientOptions, StoreError> {
    config.validate()?;

    let hosts = config
        .hosts
        .iter()
        .map(|host| host.trim())
        .filter(|host| !host.is_empty())
        .map(|host| {
            ServerAddress::parse(host)
                .map_err(|e| StoreError::InvalidConfig(format!("invalid host {host:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let credential = (!config.username.is_empty()).then(|| {
        Credential::builder()
            .username(config.username.clone())
            .password(config.password.clone())
            .build()
    });

    Ok(ClientOptions::builder()
        .hosts(hosts)
        .credential(credential)
        .connect_timeout(config.connection_timeout)
        .server_selection_timeout(config.resource_timeout)
        .build())
}

fn unique_index(field: &str, name: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(name.to_string())
                .build(),
        )
        .build()
}

fn unavailable(e: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// User records in a MongoDB collection.
pub struct MongoUserStore {
    collection: Collection<User>,
    namespace: String,
    resource_timeout: Duration,
}

impl MongoUserStore {
    /// Connect, verify the server answers and ensure the unique indexes.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::with_options(client_options(config)?).map_err(unavailable)?;
        let database = client.database(&config.database);

        let store = Self {
            collection: database.collection::<User>(&config.collection),
            namespace: format!("{}.{}", config.database, config.collection),
            resource_timeout: config.resource_timeout,
        };

        store
            .bounded("ping", database.run_command(doc! { "ping": 1 }, None))
            .await?;
        store
            .bounded(
                "create_indexes",
                store.collection.create_indexes(
                    [
                        unique_index("userID", USER_ID_INDEX),
                        unique_index("userName", USER_NAME_INDEX),
                    ],
                    None,
                ),
            )
            .await?;

        info!(
            hosts = ?config.hosts,
            namespace = %store.namespace,
            "MongoDB user store ready (indexes: userID_index, userName_index)"
        );
        Ok(store)
    }

    /// `database.collection` this store serves.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert or replace the record with the same `userID`.
    ///
    /// Fails with `Duplicate` if another record already holds the `userName`.
    pub async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        let replaced = tokio::time::timeout(
            self.resource_timeout,
            self.collection
                .replace_one(doc! { "userID": user.user_id.as_str() }, user, options),
        )
        .await
        .map_err(|_| StoreError::Unavailable("replace_one timed out".to_string()))?;

        match replaced {
            Ok(_) => Ok(()),
            Err(e) => Err(duplicate_or_unavailable(e, user)),
        }
    }

    /// Upsert every record, stopping at the first failure.
    ///
    /// Returns how many records were written.
    pub async fn seed(&self, users: impl IntoIterator<Item = User>) -> Result<usize, StoreError> {
        let mut written = 0;
        for user in users {
            self.upsert(&user).await?;
            written += 1;
        }
        debug!(namespace = %self.namespace, written, "User store seeded");
        Ok(written)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = mongodb::error::Result<T>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.resource_timeout, call)
            .await
            .map_err(|_| StoreError::Unavailable(format!("{operation} timed out")))?
            .map_err(unavailable)
    }
}

fn duplicate_or_unavailable(e: mongodb::error::Error, user: &User) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write)) = e.kind.as_ref() {
        if write.code == DUPLICATE_KEY {
            return if write.message.contains(USER_NAME_INDEX) {
                StoreError::Duplicate {
                    index: USER_NAME_INDEX,
                    value: user.user_name.clone(),
                }
            } else {
                StoreError::Duplicate {
                    index: USER_ID_INDEX,
                    value: user.user_id.clone(),
                }
            };
        }
    }
    unavailable(e)
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_username(&self, user_name: &str) -> Result<User, StoreError> {
        self.bounded(
            "find_one",
            self.collection
                .find_one(doc! { "userName": user_name }, None),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(user_name.to_string()))
    }
}
