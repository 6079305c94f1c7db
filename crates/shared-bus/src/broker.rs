//! # In-Memory Broker
//!
//! Topic-addressed message broker for single-process deployments and tests.
//!
//! Uses `tokio::sync::broadcast` per topic for fan-out to every consumer.
//! Topics are created on first use. Each topic has a single partition (0)
//! with a monotonically increasing offset.

use crate::message::{InboundMessage, OutboundMessage, TransportError};
use crate::publisher::ProducerChannels;
use crate::subscriber::InMemoryConsumer;
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_MESSAGE_BYTES};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

struct TopicLog {
    sender: broadcast::Sender<InboundMessage>,
    next_offset: i64,
}

impl TopicLog {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_offset: 0,
        }
    }
}

/// In-memory implementation of the message transport.
pub struct InMemoryBroker {
    /// Topic logs by name.
    topics: RwLock<HashMap<String, TopicLog>>,

    /// Per-topic channel capacity.
    capacity: usize,

    /// Largest accepted message value.
    max_message_bytes: usize,

    /// Total messages accepted.
    messages_published: AtomicU64,
}

impl InMemoryBroker {
    /// Create a broker with default capacity and size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a broker with the given per-topic capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            messages_published: AtomicU64::new(0),
        }
    }

    /// Set the largest accepted message value.
    #[must_use]
    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Publish a message. Returns the offset it was assigned.
    ///
    /// A message published to a topic without consumers is accepted and
    /// dropped.
    pub fn publish(&self, message: &OutboundMessage) -> Result<i64, TransportError> {
        if message.value.len() > self.max_message_bytes {
            return Err(TransportError::MessageTooLarge {
                size: message.value.len(),
                limit: self.max_message_bytes,
            });
        }
        self.append(&message.topic, Some(message.value.clone()))
    }

    /// Publish a message with no value.
    pub fn publish_tombstone(&self, topic: &str) -> Result<i64, TransportError> {
        self.append(topic, None)
    }

    fn append(&self, topic: &str, value: Option<Vec<u8>>) -> Result<i64, TransportError> {
        if topic.is_empty() {
            return Err(TransportError::InvalidTopic(topic.to_string()));
        }

        let mut topics = self.topics.write();
        let log = topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::new(self.capacity));

        let offset = log.next_offset;
        log.next_offset += 1;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let message = InboundMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            value,
        };

        match log.sender.send(message) {
            Ok(receivers) => {
                debug!(topic = %topic, offset, receivers, "Message published");
            }
            Err(_) => {
                debug!(topic = %topic, offset, "Message dropped (no consumers)");
            }
        }

        Ok(offset)
    }

    /// Subscribe to every message published to `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<InboundMessage> {
        let mut topics = self.topics.write();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::new(self.capacity))
            .sender
            .subscribe()
    }

    /// Start a producer feeding this broker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn producer(self: &Arc<Self>) -> ProducerChannels {
        ProducerChannels::in_memory(Arc::clone(self), self.capacity)
    }

    /// Create a consumer-group member subscribed to `topics`.
    ///
    /// The subscription starts immediately, so messages published after this
    /// call are delivered once `consume` runs.
    pub fn consumer(self: &Arc<Self>, group: impl Into<String>, topics: Vec<String>) -> InMemoryConsumer {
        InMemoryConsumer::new(Arc::clone(self), group.into(), topics)
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, |log| log.sender.receiver_count())
    }

    /// Total messages accepted.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Per-topic channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}
