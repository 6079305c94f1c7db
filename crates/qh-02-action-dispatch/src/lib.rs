//! # Action Dispatch (QH-02)
//!
//! Routes admitted commands to a registered action and builds exactly one
//! correlated `CommandResult` per routable command.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `ActionTag`, the `Action` contract, `ActionRegistry`
//! - **Actions** (`actions/`): `LoginUser`
//! - **Ports Layer** (`ports/`): `ActionDispatchApi`, `UserStore`, `IdGenerator`
//! - **Adapters** (`adapters/`): `MongoUserStore`, `InMemoryUserStore`
//! - **Service Layer** (`service.rs`): `Dispatcher`
//!
//! ## Correlation
//!
//! A result's `correlationId` is the command's own `id`. The command's
//! `correlationId` field is not consulted.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod actions;
pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use actions::{hash_password, LoginAction};
pub use adapters::store_config::{DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_RESOURCE_TIMEOUT_MS};
pub use adapters::{InMemoryUserStore, MongoUserStore, StoreConfig};
pub use domain::{Action, ActionRegistry, ActionRegistryBuilder, ActionTag, UnknownAction};
pub use ports::{
    ActionDispatchApi, IdError, IdGenerator, OsRngIdGenerator, StoreError, UserStore,
};
pub use service::{Dispatcher, DispatcherConfig};
