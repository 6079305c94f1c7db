//! Ports for action dispatch.

pub mod inbound;
pub mod outbound;

pub use inbound::ActionDispatchApi;
pub use outbound::{IdError, IdGenerator, OsRngIdGenerator, StoreError, UserStore};
