//! # Transport Messages
//!
//! Opaque byte messages as the transport sees them.

use thiserror::Error;

/// A message delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was read from.
    pub topic: String,
    /// Partition within the topic.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Message value. `None` for tombstones.
    pub value: Option<Vec<u8>>,
}

/// A message handed to a producer for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Message value.
    pub value: Vec<u8>,
}

impl OutboundMessage {
    /// Create a message for a topic.
    pub fn new(topic: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            value,
        }
    }
}

/// Transport failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The consumer context was closed; the claim's message stream ended.
    #[error("context closed")]
    ContextClosed,

    /// Message value exceeds the broker's size limit.
    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge { size: usize, limit: usize },

    /// Topic name was empty.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    /// Broker is not available.
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// An asynchronous send failure, reported on the producer's error channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to publish to {}: {}", .message.topic, .error)]
pub struct ProducerError {
    /// The message that could not be published.
    pub message: OutboundMessage,
    /// Why it failed.
    pub error: TransportError,
}
