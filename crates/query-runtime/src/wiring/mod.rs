//! # Wiring
//!
//! Connects the transport's consumer session to the query pipeline.

pub mod consumer;

pub use consumer::QueryClaimHandler;
