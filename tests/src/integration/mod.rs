//! Cross-crate pipeline scenarios.

pub mod harness;

mod delivery;
mod query_flow;
