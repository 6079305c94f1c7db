//! Ports for command intake.

pub mod inbound;
pub mod outbound;

pub use inbound::CommandIntakeApi;
pub use outbound::{SystemTimeSource, TimeSource};
