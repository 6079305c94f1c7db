//! # User-Auth Query Handler Test Suite
//!
//! End-to-end scenarios driving the full pipeline over the in-memory broker.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs      # Running pipeline + request/response helpers
//!     ├── query_flow.rs   # Admission, routing and login outcomes
//!     └── delivery.rs     # Acknowledgement, fan-out and shutdown
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qh-tests
//! cargo test -p qh-tests integration::query_flow::
//! ```

pub mod integration;
