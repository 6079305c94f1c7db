//! The two publication workers.
//!
//! The send worker is the single consumer of the result queue. The error
//! worker drains the producer's asynchronous failure stream. They fail
//! independently: a stalled error stream never blocks sending.

use query_telemetry::{PUBLISH_FAILURES, RESULT_ENCODE_FAILURES};
use shared_bus::{OutboundMessage, ProducerChannels, ProducerError};
use shared_types::CommandResult;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::publisher::ResultPublisher;

/// Handles of the running workers.
pub struct PublisherWorkers {
    pub sender: JoinHandle<()>,
    pub errors: JoinHandle<()>,
}

impl PublisherWorkers {
    /// Wait for both workers to finish.
    ///
    /// The send worker finishes once every `ResultPublisher` clone is dropped
    /// and the queue is empty; the error worker once the producer closes its
    /// error stream.
    pub async fn join(self) {
        if let Err(e) = self.sender.await {
            error!(error = %e, "Result send worker panicked");
        }
        if let Err(e) = self.errors.await {
            error!(error = %e, "Publish error worker panicked");
        }
    }
}

/// Start publishing into `producer` through a queue of `capacity` results.
///
/// Must be called from within a Tokio runtime.
pub fn start(producer: ProducerChannels, capacity: usize) -> (ResultPublisher, PublisherWorkers) {
    let (queue, results) = mpsc::channel(capacity.max(1));
    let ProducerChannels { input, errors } = producer;

    let workers = PublisherWorkers {
        sender: tokio::spawn(send_results(results, input)),
        errors: tokio::spawn(drain_errors(errors)),
    };
    info!(capacity = capacity.max(1), "Result publisher started");

    (ResultPublisher::new(queue), workers)
}

async fn send_results(
    mut results: mpsc::Receiver<CommandResult>,
    input: mpsc::Sender<OutboundMessage>,
) {
    while let Some(result) = results.recv().await {
        let value = match result.encode() {
            Ok(value) => value,
            Err(e) => {
                RESULT_ENCODE_FAILURES.inc();
                error!(
                    result_id = %result.id,
                    correlation_id = %result.correlation_id,
                    error = %e,
                    "Dropping result that could not be encoded"
                );
                continue;
            }
        };

        debug!(
            result_id = %result.id,
            correlation_id = %result.correlation_id,
            topic = %result.topic,
            "Forwarding result"
        );
        if input
            .send(OutboundMessage::new(result.topic, value))
            .await
            .is_err()
        {
            error!("Producer input closed, result send worker stopping");
            return;
        }
    }
    debug!("Result queue closed, result send worker stopping");
}

async fn drain_errors(mut errors: mpsc::Receiver<ProducerError>) {
    while let Some(failure) = errors.recv().await {
        PUBLISH_FAILURES.inc();
        error!(
            topic = %failure.message.topic,
            error = %failure.error,
            "Failed to publish result"
        );
    }
    debug!("Producer error stream closed, publish error worker stopping");
}
