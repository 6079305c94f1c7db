//! # Consumer Side
//!
//! Consumer-group style intake: a `MessageConsumer` hands each claim (one
//! topic partition) to a `ClaimHandler`, which acknowledges messages through
//! the `ConsumerSession`.

use crate::broker::InMemoryBroker;
use crate::message::{InboundMessage, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A consumer-group session, used to acknowledge delivered messages.
pub trait ConsumerSession: Send + Sync {
    /// Mark a message as consumed. Its offset will not be redelivered to
    /// this group.
    fn mark_message(&self, message: &InboundMessage, metadata: &str);

    /// Consumer group this session belongs to.
    fn group(&self) -> &str;
}

/// The stream of messages for one topic partition.
pub struct Claim {
    topic: String,
    partition: i32,
    messages: mpsc::Receiver<InboundMessage>,
}

impl Claim {
    /// Create a claim over a message channel.
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        messages: mpsc::Receiver<InboundMessage>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            messages,
        }
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the consumer context is closed.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        self.messages.recv().await
    }

    /// Topic of this claim.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Partition of this claim.
    #[must_use]
    pub fn partition(&self) -> i32 {
        self.partition
    }
}

/// Handles the claims of a consumer-group session.
#[async_trait]
pub trait ClaimHandler: Send + Sync {
    /// Called once before any claim is consumed.
    async fn setup(&self, _session: &dyn ConsumerSession) -> Result<(), TransportError> {
        Ok(())
    }

    /// Called once after every claim has finished.
    async fn cleanup(&self, _session: &dyn ConsumerSession) -> Result<(), TransportError> {
        Ok(())
    }

    /// Consume one claim until its message stream ends.
    async fn consume_claim(
        &self,
        session: Arc<dyn ConsumerSession>,
        claim: Claim,
    ) -> Result<(), TransportError>;
}

/// A consumer-group member.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Run the handler over this member's claims until the context closes.
    async fn consume(&self, handler: Arc<dyn ClaimHandler>) -> Result<(), TransportError>;

    /// Close the consumer context. Running claims see their streams end.
    fn close(&self);
}

/// Wait for every claim task; the first claim error is the session's outcome.
pub(crate) async fn join_claims(
    mut claims: JoinSet<Result<(), TransportError>>,
) -> Result<(), TransportError> {
    let mut outcome = Ok(());
    while let Some(joined) = claims.join_next().await {
        let result = joined.unwrap_or_else(|e| {
            Err(TransportError::Unavailable(format!("claim task failed: {e}")))
        });
        if outcome.is_ok() {
            outcome = result;
        }
    }
    outcome
}

/// Session that records committed offsets in memory.
pub struct InMemorySession {
    group: String,
    committed: Mutex<HashMap<(String, i32), i64>>,
    marks: AtomicU64,
}

impl InMemorySession {
    /// Create a session for a consumer group.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            committed: Mutex::new(HashMap::new()),
            marks: AtomicU64::new(0),
        }
    }

    /// Next offset to be delivered for a partition, if anything was marked.
    #[must_use]
    pub fn committed_offset(&self, topic: &str, partition: i32) -> Option<i64> {
        self.committed
            .lock()
            .get(&(topic.to_string(), partition))
            .copied()
    }

    /// Total `mark_message` calls.
    #[must_use]
    pub fn marked_count(&self) -> u64 {
        self.marks.load(Ordering::SeqCst)
    }
}

impl ConsumerSession for InMemorySession {
    fn mark_message(&self, message: &InboundMessage, _metadata: &str) {
        let mut committed = self.committed.lock();
        let next = message.offset + 1;
        committed
            .entry((message.topic.clone(), message.partition))
            .and_modify(|offset| *offset = (*offset).max(next))
            .or_insert(next);
        self.marks.fetch_add(1, Ordering::SeqCst);
    }

    fn group(&self) -> &str {
        &self.group
    }
}

/// Consumer-group member reading from an `InMemoryBroker`.
pub struct InMemoryConsumer {
    broker: Arc<InMemoryBroker>,
    topics: Vec<String>,
    pending: Mutex<Vec<(String, broadcast::Receiver<InboundMessage>)>>,
    session: Arc<InMemorySession>,
    shutdown: watch::Sender<bool>,
}

impl InMemoryConsumer {
    pub(crate) fn new(broker: Arc<InMemoryBroker>, group: String, topics: Vec<String>) -> Self {
        let pending = topics
            .iter()
            .map(|topic| (topic.clone(), broker.subscribe(topic)))
            .collect();
        let (shutdown, _) = watch::channel(false);

        Self {
            broker,
            topics,
            pending: Mutex::new(pending),
            session: Arc::new(InMemorySession::new(group)),
            shutdown,
        }
    }

    /// The session messages are marked on.
    #[must_use]
    pub fn session(&self) -> Arc<InMemorySession> {
        Arc::clone(&self.session)
    }

    fn take_receivers(&self) -> Vec<(String, broadcast::Receiver<InboundMessage>)> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return self
                .topics
                .iter()
                .map(|topic| (topic.clone(), self.broker.subscribe(topic)))
                .collect();
        }
        std::mem::take(&mut *pending)
    }

    fn spawn_forwarder(
        &self,
        topic: String,
        mut receiver: broadcast::Receiver<InboundMessage>,
        claim_tx: mpsc::Sender<InboundMessage>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    received = receiver.recv() => match received {
                        Ok(message) => {
                            if claim_tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(count)) => {
                            warn!(topic = %topic, lagged = count, "Consumer lagged, messages skipped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!(topic = %topic, "Claim forwarder stopped");
        });
    }
}

#[async_trait]
impl MessageConsumer for InMemoryConsumer {
    async fn consume(&self, handler: Arc<dyn ClaimHandler>) -> Result<(), TransportError> {
        let session: Arc<dyn ConsumerSession> = self.session.clone();
        handler.setup(session.as_ref()).await?;
        info!(group = %self.session.group(), topics = ?self.topics, "Consumer session started");

        let mut claims = JoinSet::new();
        for (topic, receiver) in self.take_receivers() {
            let (claim_tx, claim_rx) = mpsc::channel(self.broker.capacity());
            self.spawn_forwarder(topic.clone(), receiver, claim_tx);

            let handler = Arc::clone(&handler);
            let session = Arc::clone(&session);
            claims.spawn(async move {
                handler
                    .consume_claim(session, Claim::new(topic, 0, claim_rx))
                    .await
            });
        }

        let outcome = join_claims(claims).await;

        handler.cleanup(session.as_ref()).await?;
        info!(group = %self.session.group(), "Consumer session ended");
        outcome
    }

    fn close(&self) {
        self.shutdown.send_replace(true);
    }
}
