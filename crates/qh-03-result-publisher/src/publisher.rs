//! The publisher handle held by dispatch tasks.

use shared_types::CommandResult;
use thiserror::Error;
use tokio::sync::mpsc;

/// Result queue failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The send worker has stopped; nothing will drain the queue.
    #[error("result queue closed")]
    QueueClosed,
}

/// Cloneable handle feeding the result queue.
///
/// Many dispatch tasks publish concurrently; a single worker drains the queue.
#[derive(Debug, Clone)]
pub struct ResultPublisher {
    queue: mpsc::Sender<CommandResult>,
}

impl ResultPublisher {
    pub(crate) fn new(queue: mpsc::Sender<CommandResult>) -> Self {
        Self { queue }
    }

    /// Enqueue a result for publication.
    ///
    /// Waits only while the queue is full. Delivery is attempted once;
    /// transport failures are reported by the error worker, not here.
    pub async fn publish(&self, result: CommandResult) -> Result<(), PublishError> {
        self.queue
            .send(result)
            .await
            .map_err(|_| PublishError::QueueClosed)
    }

    /// Results waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }
}
