//! Domain layer: action tags, the action contract and the registry.

pub mod action;
pub mod registry;

pub use action::{Action, ActionTag, UnknownAction};
pub use registry::{ActionRegistry, ActionRegistryBuilder};
