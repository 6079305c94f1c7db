//! # Redis Streams Adapter
//!
//! Consumer-group transport over Redis Streams: a topic is a stream key, the
//! consumer group is a Redis consumer group, `mark_message` becomes `XACK`
//! and the producer appends with `XADD`. The message value travels in the
//! entry field `value`; an entry without it is delivered as a tombstone.
//!
//! A blocking `XREADGROUP` holds its connection until it returns, so every
//! stream is read on its own connection and acknowledgements and
//! publication use separate ones.

use crate::message::{InboundMessage, OutboundMessage, ProducerError, TransportError};
use crate::publisher::ProducerChannels;
use crate::subscriber::{join_claims, Claim, ClaimHandler, ConsumerSession, MessageConsumer};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Entry field holding the message value.
pub const VALUE_FIELD: &str = "value";

/// How long one `XREADGROUP` waits for new entries.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Entries requested per `XREADGROUP`.
pub const DEFAULT_BATCH_SIZE: usize = 64;

const RETRY_DELAY: Duration = Duration::from_secs(1);

impl From<RedisError> for TransportError {
    fn from(e: RedisError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// Connection URL for a broker address. Bare `host:port` means `redis://`.
#[must_use]
pub fn broker_url(broker: &str) -> String {
    if broker.contains("://") {
        broker.to_string()
    } else {
        format!("redis://{broker}")
    }
}

/// Redis Streams consumer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisStreamsConfig {
    /// Broker addresses, tried in order until one answers.
    pub brokers: Vec<String>,
    /// Consumer group.
    pub group: String,
    /// This member's name within the group.
    pub consumer_name: String,
    /// Streams to consume.
    pub streams: Vec<String>,
    pub block_timeout: Duration,
    pub batch_size: usize,
}

impl RedisStreamsConfig {
    pub fn new(
        brokers: Vec<String>,
        group: impl Into<String>,
        consumer_name: impl Into<String>,
        streams: Vec<String>,
    ) -> Self {
        Self {
            brokers,
            group: group.into(),
            consumer_name: consumer_name.into(),
            streams,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// An acknowledgement waiting to be sent: stream key and entry id.
type PendingAck = (String, String);

/// Session of one `consume` call. Marks are queued and sent as `XACK` by a
/// background task.
pub struct RedisStreamsSession {
    group: String,
    /// `(stream, offset)` -> entry id, for delivered but unmarked entries.
    delivered: Mutex<HashMap<(String, i64), String>>,
    acks: mpsc::UnboundedSender<PendingAck>,
}

impl RedisStreamsSession {
    fn new(group: String, acks: mpsc::UnboundedSender<PendingAck>) -> Self {
        Self {
            group,
            delivered: Mutex::new(HashMap::new()),
            acks,
        }
    }

    fn track(&self, stream: &str, offset: i64, entry_id: String) {
        self.delivered
            .lock()
            .insert((stream.to_string(), offset), entry_id);
    }

    /// Entries delivered to a claim and not yet marked.
    #[must_use]
    pub fn unmarked_count(&self) -> usize {
        self.delivered.lock().len()
    }
}

impl ConsumerSession for RedisStreamsSession {
    fn mark_message(&self, message: &InboundMessage, _metadata: &str) {
        let entry_id = self
            .delivered
            .lock()
            .remove(&(message.topic.clone(), message.offset));
        let Some(entry_id) = entry_id else {
            debug!(topic = %message.topic, offset = message.offset, "Message already marked");
            return;
        };
        if self.acks.send((message.topic.clone(), entry_id)).is_err() {
            warn!(topic = %message.topic, offset = message.offset, "Acknowledger stopped, mark dropped");
        }
    }

    fn group(&self) -> &str {
        &self.group
    }
}

fn to_inbound(stream: &str, offset: i64, entry: &StreamId) -> InboundMessage {
    InboundMessage {
        topic: stream.to_string(),
        partition: 0,
        offset,
        value: entry.get::<Vec<u8>>(VALUE_FIELD),
    }
}

async fn open_first(brokers: &[String]) -> Result<(Client, MultiplexedConnection), TransportError> {
    let mut last_error = TransportError::Unavailable("no brokers configured".to_string());
    for broker in brokers {
        let attempt = async {
            let client = Client::open(broker_url(broker).as_str())?;
            let connection = client.get_multiplexed_async_connection().await?;
            Ok::<_, RedisError>((client, connection))
        };
        match attempt.await {
            Ok(opened) => {
                info!(broker = %broker, "Connected to broker");
                return Ok(opened);
            }
            Err(e) => {
                warn!(broker = %broker, error = %e, "Broker unreachable");
                last_error = e.into();
            }
        }
    }
    Err(last_error)
}

async fn ensure_group(
    connection: &mut MultiplexedConnection,
    stream: &str,
    group: &str,
) -> Result<(), TransportError> {
    let created: RedisResult<()> = connection.xgroup_create_mkstream(stream, group, "$").await;
    match created {
        Ok(()) => info!(stream = %stream, group = %group, "Created consumer group"),
        Err(e) if e.code() == Some("BUSYGROUP") => {
            debug!(stream = %stream, group = %group, "Consumer group already exists");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Consumer-group member reading Redis Streams.
pub struct RedisStreamsConsumer {
    client: Client,
    config: RedisStreamsConfig,
    shutdown: watch::Sender<bool>,
}

impl RedisStreamsConsumer {
    /// Connect to the first reachable broker and ensure the consumer group
    /// exists on every stream.
    pub async fn connect(config: RedisStreamsConfig) -> Result<Self, TransportError> {
        let (client, mut connection) = open_first(&config.brokers).await?;
        for stream in &config.streams {
            ensure_group(&mut connection, stream, &config.group).await?;
        }
        info!(
            group = %config.group,
            consumer = %config.consumer_name,
            streams = ?config.streams,
            "Redis Streams consumer ready"
        );

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            client,
            config,
            shutdown,
        })
    }

    /// Start a producer on the same broker.
    ///
    /// The producer task ends when every `input` sender has been dropped.
    pub async fn producer(&self, capacity: usize) -> Result<ProducerChannels, TransportError> {
        let connection = self.client.get_multiplexed_async_connection().await?;
        Ok(start_producer(connection, capacity))
    }

    fn spawn_acknowledger(&self, mut acks: mpsc::UnboundedReceiver<PendingAck>) {
        let client = self.client.clone();
        let group = self.config.group.clone();
        tokio::spawn(async move {
            let mut connection: Option<MultiplexedConnection> = None;
            while let Some((stream, entry_id)) = acks.recv().await {
                if connection.is_none() {
                    match client.get_multiplexed_async_connection().await {
                        Ok(opened) => connection = Some(opened),
                        Err(e) => {
                            warn!(stream = %stream, entry_id = %entry_id, error = %e, "XACK skipped, broker unreachable");
                            continue;
                        }
                    }
                }
                let Some(active) = connection.as_mut() else {
                    continue;
                };
                let acked: RedisResult<i64> = active.xack(&stream, &group, &[&entry_id]).await;
                match acked {
                    Ok(1) => debug!(stream = %stream, entry_id = %entry_id, "Acknowledged entry"),
                    Ok(count) => warn!(stream = %stream, entry_id = %entry_id, count, "XACK acknowledged no entry"),
                    Err(e) => {
                        warn!(stream = %stream, entry_id = %entry_id, error = %e, "XACK failed");
                        connection = None;
                    }
                }
            }
            debug!("Acknowledger stopped");
        });
    }

    fn spawn_reader(
        &self,
        stream: String,
        session: Arc<RedisStreamsSession>,
        claim_tx: mpsc::Sender<InboundMessage>,
    ) {
        let client = self.client.clone();
        let group = self.config.group.clone();
        let options = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer_name)
            .count(self.config.batch_size.max(1))
            .block(usize::try_from(self.config.block_timeout.as_millis()).unwrap_or(usize::MAX));
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut connection: Option<MultiplexedConnection> = None;
            let mut offset: i64 = 0;
            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }

                if connection.is_none() {
                    let reopened = async {
                        let mut opened = client.get_multiplexed_async_connection().await?;
                        ensure_group(&mut opened, &stream, &group).await?;
                        Ok::<_, TransportError>(opened)
                    };
                    match reopened.await {
                        Ok(opened) => connection = Some(opened),
                        Err(e) => {
                            warn!(stream = %stream, error = %e, "Stream reader reconnect failed");
                            tokio::time::sleep(RETRY_DELAY).await;
                            continue;
                        }
                    }
                }
                let Some(active) = connection.as_mut() else {
                    continue;
                };

                let stream_keys = [&stream];
                let read: RedisResult<Option<StreamReadReply>> = tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    read = active.xread_options::<_, _, Option<StreamReadReply>>(
                        &stream_keys,
                        &[">"],
                        &options,
                    ) => read,
                };

                match read {
                    Ok(None) => {}
                    Ok(Some(reply)) => {
                        for entry in reply.keys.iter().flat_map(|key| key.ids.iter()) {
                            session.track(&stream, offset, entry.id.clone());
                            let message = to_inbound(&stream, offset, entry);
                            offset += 1;
                            if claim_tx.send(message).await.is_err() {
                                debug!(stream = %stream, "Claim closed, reader stopping");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(stream = %stream, error = %e, "XREADGROUP failed, reconnecting");
                        connection = None;
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
            debug!(stream = %stream, "Stream reader stopped");
        });
    }
}

#[async_trait]
impl MessageConsumer for RedisStreamsConsumer {
    async fn consume(&self, handler: Arc<dyn ClaimHandler>) -> Result<(), TransportError> {
        let (acks_tx, acks_rx) = mpsc::unbounded_channel();
        self.spawn_acknowledger(acks_rx);
        let redis_session = Arc::new(RedisStreamsSession::new(self.config.group.clone(), acks_tx));
        let session: Arc<dyn ConsumerSession> = redis_session.clone();

        handler.setup(session.as_ref()).await?;
        info!(group = %self.config.group, streams = ?self.config.streams, "Consumer session started");

        let mut claims = JoinSet::new();
        for stream in &self.config.streams {
            let (claim_tx, claim_rx) = mpsc::channel(self.config.batch_size.max(1));
            self.spawn_reader(stream.clone(), Arc::clone(&redis_session), claim_tx);

            let handler = Arc::clone(&handler);
            let session = Arc::clone(&session);
            let claim = Claim::new(stream.clone(), 0, claim_rx);
            claims.spawn(async move { handler.consume_claim(session, claim).await });
        }

        let outcome = join_claims(claims).await;

        handler.cleanup(session.as_ref()).await?;
        info!(group = %self.config.group, "Consumer session ended");
        outcome
    }

    fn close(&self) {
        self.shutdown.send_replace(true);
    }
}

fn start_producer(mut connection: MultiplexedConnection, capacity: usize) -> ProducerChannels {
    let (input, mut input_rx) = mpsc::channel::<OutboundMessage>(capacity.max(1));
    let (errors_tx, errors) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        while let Some(message) = input_rx.recv().await {
            let error = if message.topic.is_empty() {
                TransportError::InvalidTopic(message.topic.clone())
            } else {
                let appended: RedisResult<String> = connection
                    .xadd(&message.topic, "*", &[(VALUE_FIELD, message.value.as_slice())])
                    .await;
                match appended {
                    Ok(entry_id) => {
                        debug!(topic = %message.topic, entry_id = %entry_id, "Message published");
                        continue;
                    }
                    Err(e) => e.into(),
                }
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

    ProducerChannels::new(input, errors)
}
