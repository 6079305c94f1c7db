//! # Shared Types Crate
//!
//! This crate contains the wire data model of the query pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Command` and `CommandResult` are defined once
//!   and shared by intake, dispatch and publication.
//! - **Immutable Messages**: A `Command` is never mutated after decoding and a
//!   `CommandResult` is never mutated after it is built.
//! - **Typed Failures**: `ActionError` keeps "your request was wrong" apart from
//!   "we failed" all the way into `errorCode`/`errorMessage`.

pub mod command;
pub mod entities;
pub mod errors;
pub mod result;

pub use command::Command;
pub use entities::{LoginCredentials, User};
pub use errors::{codes, ActionError, Attribution, CodecError};
pub use result::CommandResult;
