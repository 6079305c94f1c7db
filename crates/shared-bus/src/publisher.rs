//! # Producer Side
//!
//! A producer is a pair of channels: messages go in on `input`, send failures
//! come back on `errors`. Both are asynchronous; nothing on the input side
//! waits for the broker.

use crate::broker::InMemoryBroker;
use crate::message::{OutboundMessage, ProducerError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Channels of a running producer.
pub struct ProducerChannels {
    /// Messages to publish.
    pub input: mpsc::Sender<OutboundMessage>,
    /// Asynchronous send failures.
    pub errors: mpsc::Receiver<ProducerError>,
}

impl ProducerChannels {
    /// Wrap channels provided by a transport adapter.
    pub fn new(
        input: mpsc::Sender<OutboundMessage>,
        errors: mpsc::Receiver<ProducerError>,
    ) -> Self {
        Self { input, errors }
    }

    /// Start a producer task that publishes into an in-memory broker.
    ///
    /// The task ends when every `input` sender has been dropped.
    pub fn in_memory(broker: Arc<InMemoryBroker>, capacity: usize) -> Self {
        let (input, mut input_rx) = mpsc::channel::<OutboundMessage>(capacity);
        let (errors_tx, errors) = mpsc::channel(capacity);

        tokio::spawn(async move {
            while let Some(message) = input_rx.recv().await {
                let Err(error) = broker.publish(&message) else {
                    continue;
                };
                if errors_tx
                    .send(ProducerError { message, error })
                    .await
                    .is_err()
                {
                    warn!("Producer error dropped (error channel closed)");
                }
            }
            debug!("Producer input closed");
        });

        Self { input, errors }
    }
}
