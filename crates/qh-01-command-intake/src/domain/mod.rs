//! Domain layer: decoding, field validation and the expiry rule.

pub mod errors;
pub mod gate;

pub use errors::Rejection;
pub use gate::{deadline_of, is_past, CommandGate};
