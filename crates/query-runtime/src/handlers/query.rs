//! # Query Pipeline
//!
//! One delivered message through intake, dispatch and publication.

use qh_01_command_intake::CommandIntakeApi;
use qh_02_action_dispatch::ActionDispatchApi;
use qh_03_result_publisher::ResultPublisher;
use query_telemetry::{COMMANDS_RECEIVED, COMMANDS_REJECTED};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The message carried no value.
    Empty,
    /// The intake gate rejected it.
    Rejected,
    /// No action is registered under its name.
    Unroutable,
    /// A result was queued for publication.
    Published,
    /// The result queue was closed.
    QueueClosed,
}

/// Intake, dispatch and publication for one message.
pub struct QueryPipeline {
    intake: Arc<dyn CommandIntakeApi>,
    dispatcher: Arc<dyn ActionDispatchApi>,
    publisher: ResultPublisher,
}

impl QueryPipeline {
    pub fn new(
        intake: Arc<dyn CommandIntakeApi>,
        dispatcher: Arc<dyn ActionDispatchApi>,
        publisher: ResultPublisher,
    ) -> Self {
        Self {
            intake,
            dispatcher,
            publisher,
        }
    }

    /// Process one message value.
    pub async fn process(&self, raw: Option<&[u8]>) -> ProcessOutcome {
        COMMANDS_RECEIVED.inc();

        let Some(raw) = raw else {
            COMMANDS_REJECTED.with_label_values(&["empty"]).inc();
            debug!("Skipping message without a value");
            return ProcessOutcome::Empty;
        };

        let Some(command) = self.intake.admit(raw) else {
            return ProcessOutcome::Rejected;
        };
        info!(command_id = %command.id, action = %command.action, "Received query");

        let Some(result) = self.dispatcher.dispatch(&command).await else {
            return ProcessOutcome::Unroutable;
        };

        match self.publisher.publish(result).await {
            Ok(()) => ProcessOutcome::Published,
            Err(e) => {
                error!(command_id = %command.id, error = %e, "Result dropped");
                ProcessOutcome::QueueClosed
            }
        }
    }
}
