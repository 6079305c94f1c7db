//! # Command Intake (QH-01)
//!
//! First stage of the query pipeline: decodes each delivered message into a
//! `Command` and drops anything malformed, incomplete or expired.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Decoding, field checks and the expiry rule
//! - **Ports Layer** (`ports/`): `CommandIntakeApi` and the `TimeSource` clock
//! - **Service Layer** (`service.rs`): Logging and rejection metrics
//!
//! ## Expiry
//!
//! A command is expired iff `issuedAt + ttlSeconds` (UTC) is strictly before
//! the current time. The check runs once, at admission.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{deadline_of, is_past, CommandGate, Rejection};
pub use ports::{CommandIntakeApi, SystemTimeSource, TimeSource};
pub use service::CommandIntakeService;
