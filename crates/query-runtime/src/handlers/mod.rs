//! # Message Handlers
//!
//! Per-message processing for the query consumer.

pub mod query;

pub use query::{ProcessOutcome, QueryPipeline};
