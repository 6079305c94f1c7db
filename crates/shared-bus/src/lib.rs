//! # Shared Bus - Message Transport Port
//!
//! The transport seam of the query pipeline, modelled on consumer-group
//! semantics: messages arrive per claim, each delivered message is
//! acknowledged through the session, and outbound messages go through a
//! producer's input channel while send failures come back on a separate
//! error channel.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  claim.recv()   ┌──────────────┐  input.send()  ┌──────────────┐
//! │   Broker     │ ──────────────→ │ ClaimHandler │ ─────────────→ │   Producer   │
//! │              │ ←────────────── │              │ ←───────────── │              │
//! └──────────────┘  mark_message() └──────────────┘  errors.recv() └──────────────┘
//! ```
//!
//! ## Adapters
//!
//! - `InMemoryBroker`: process-local topics, used by the test suites
//! - `RedisStreamsConsumer`: Redis Streams consumer groups, `XACK` and `XADD`
//!
//! Both implement `MessageConsumer` and hand out `ProducerChannels`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broker;
pub mod message;
pub mod publisher;
pub mod redis_streams;
pub mod subscriber;

pub use broker::InMemoryBroker;
pub use message::{InboundMessage, OutboundMessage, ProducerError, TransportError};
pub use publisher::ProducerChannels;
pub use redis_streams::{RedisStreamsConfig, RedisStreamsConsumer, RedisStreamsSession};
pub use subscriber::{
    Claim, ClaimHandler, ConsumerSession, InMemoryConsumer, InMemorySession, MessageConsumer,
};

/// Messages buffered per topic before slow consumers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Largest message value the in-memory broker accepts (1 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;
