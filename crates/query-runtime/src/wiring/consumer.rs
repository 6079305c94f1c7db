//! # Query Claim Handler
//!
//! Each delivered message is acknowledged and then processed on its own
//! task. There is no concurrency limit: in-flight work equals the burst of
//! undelivered messages. Acknowledging before processing means a crash
//! mid-flight loses the message rather than redelivering it.

use async_trait::async_trait;
use shared_bus::{Claim, ClaimHandler, ConsumerSession, TransportError};
use std::sync::Arc;
use tracing::info;

use crate::handlers::QueryPipeline;

/// `ClaimHandler` feeding the query pipeline.
pub struct QueryClaimHandler {
    pipeline: Arc<QueryPipeline>,
}

impl QueryClaimHandler {
    pub fn new(pipeline: Arc<QueryPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl ClaimHandler for QueryClaimHandler {
    async fn setup(&self, session: &dyn ConsumerSession) -> Result<(), TransportError> {
        info!(group = %session.group(), "Initializing query claim handler");
        Ok(())
    }

    async fn cleanup(&self, session: &dyn ConsumerSession) -> Result<(), TransportError> {
        info!(group = %session.group(), "Closing query claim handler");
        Ok(())
    }

    async fn consume_claim(
        &self,
        session: Arc<dyn ConsumerSession>,
        mut claim: Claim,
    ) -> Result<(), TransportError> {
        info!(topic = %claim.topic(), partition = claim.partition(), "Listening for queries");

        while let Some(message) = claim.recv().await {
            let session = Arc::clone(&session);
            let pipeline = Arc::clone(&self.pipeline);
            tokio::spawn(async move {
                session.mark_message(&message, "");
                pipeline.process(message.value.as_deref()).await;
            });
        }

        Err(TransportError::ContextClosed)
    }
}
