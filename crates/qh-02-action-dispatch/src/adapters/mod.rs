//! Adapters for the outbound ports.

pub mod mongo_store;
pub mod store_config;
pub mod user_store;

pub use mongo_store::MongoUserStore;
pub use store_config::StoreConfig;
pub use user_store::InMemoryUserStore;
