//! # Result Publisher (QH-03)
//!
//! Decouples dispatch from transport latency. Dispatch tasks push results into
//! a bounded queue; one worker encodes them and hands them to the producer,
//! and a second worker drains the producer's asynchronous send failures.
//!
//! ```text
//! dispatch tasks ──publish()──→ [queue: 256] ──→ send worker ──→ producer.input
//!                                                error worker ←── producer.errors
//! ```
//!
//! Each result gets one delivery attempt. Failures are logged and counted,
//! never retried and never reported to the command's issuer.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod publisher;
mod workers;

pub use publisher::{PublishError, ResultPublisher};
pub use workers::{start, PublisherWorkers};

/// Default result queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
