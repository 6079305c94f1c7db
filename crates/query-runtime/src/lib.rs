//! # Query Runtime Library
//!
//! Exposes the runtime's modules for the integration tests. The entry point
//! is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `admin` - `/health` and `/metrics` HTTP endpoint
//! - `config` - Environment configuration and `.env` loading
//! - `seed` - Seed file loading for the user store
//! - `handlers` - Per-message pipeline: intake, dispatch, publication
//! - `wiring` - Claim handler spawning one task per delivered message
//! - `runtime` - Assembles the above over a transport

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod admin;
pub mod config;
pub mod handlers;
pub mod runtime;
pub mod seed;
pub mod wiring;

pub use config::{ConfigError, RuntimeConfig, StoreBackend, TransportConfig};
pub use handlers::{ProcessOutcome, QueryPipeline};
pub use runtime::{QueryRuntime, RuntimeDeps, Transport};
pub use seed::SeedTarget;
pub use wiring::QueryClaimHandler;
