//! # Query Runtime
//!
//! Builds the pipeline over a transport and runs the consume loop.
//!
//! ## Startup Sequence
//!
//! 1. Start the result publisher workers on the transport's producer
//! 2. Assemble intake, dispatcher and publisher into the pipeline
//! 3. `run` the consume loop on the transport's consumer until the context
//!    closes

use qh_01_command_intake::{CommandIntakeService, SystemTimeSource, TimeSource};
use qh_02_action_dispatch::{
    ActionRegistry, Dispatcher, DispatcherConfig, IdGenerator, OsRngIdGenerator, UserStore,
};
use shared_bus::{
    ClaimHandler, InMemoryBroker, InMemoryConsumer, MessageConsumer, ProducerChannels,
    RedisStreamsConfig, RedisStreamsConsumer, TransportError,
};
use std::sync::Arc;
use tracing::info;

use crate::config::{RuntimeConfig, TransportConfig};
use crate::handlers::QueryPipeline;
use crate::wiring::QueryClaimHandler;

/// Collaborators injected into the pipeline.
pub struct RuntimeDeps {
    pub store: Arc<dyn UserStore>,
    pub time_source: Arc<dyn TimeSource>,
    pub ids: Arc<dyn IdGenerator>,
    pub registry: ActionRegistry,
}

impl RuntimeDeps {
    /// Production defaults around `store`: system clock, OS RNG ids,
    /// built-in actions.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            time_source: Arc::new(SystemTimeSource),
            ids: Arc::new(OsRngIdGenerator),
            registry: ActionRegistry::standard(),
        }
    }
}

/// Consumer subscribed to the request topic, and a producer for results.
pub struct Transport {
    pub consumer: Arc<dyn MessageConsumer>,
    pub producer: ProducerChannels,
}

impl Transport {
    pub fn new(consumer: Arc<dyn MessageConsumer>, producer: ProducerChannels) -> Self {
        Self { consumer, producer }
    }

    /// Process-local transport on `broker`.
    ///
    /// Also returns the concrete consumer, whose session records marks.
    pub fn in_memory(
        config: &TransportConfig,
        broker: &Arc<InMemoryBroker>,
    ) -> (Self, Arc<InMemoryConsumer>) {
        let consumer = Arc::new(broker.consumer(
            config.consumer_group.clone(),
            vec![config.request_topic.clone()],
        ));
        let transport = Self::new(consumer.clone(), broker.producer());
        (transport, consumer)
    }

    /// Redis Streams transport on the first reachable broker.
    pub async fn redis_streams(
        config: &TransportConfig,
        producer_capacity: usize,
    ) -> Result<Self, TransportError> {
        let consumer = RedisStreamsConsumer::connect(RedisStreamsConfig::new(
            config.brokers.clone(),
            config.consumer_group.clone(),
            config.consumer_name.clone(),
            vec![config.request_topic.clone()],
        ))
        .await?;
        let producer = consumer.producer(producer_capacity).await?;
        Ok(Self::new(Arc::new(consumer), producer))
    }
}

/// A wired query handler, ready to consume.
pub struct QueryRuntime {
    consumer: Arc<dyn MessageConsumer>,
    handler: Arc<QueryClaimHandler>,
}

impl QueryRuntime {
    /// Wire the pipeline onto `transport`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &RuntimeConfig, transport: Transport, deps: RuntimeDeps) -> Self {
        // The workers stop by themselves once every publisher handle is gone.
        let (publisher, _workers) =
            qh_03_result_publisher::start(transport.producer, config.result_queue_capacity);

        let dispatcher = Dispatcher::with_id_generator(
            DispatcherConfig {
                service_name: config.service_name.clone(),
            },
            deps.registry,
            deps.store,
            deps.ids,
        );
        let pipeline = QueryPipeline::new(
            Arc::new(CommandIntakeService::new(deps.time_source)),
            Arc::new(dispatcher),
            publisher,
        );

        info!(
            service = %config.service_name,
            brokers = ?config.transport.brokers,
            group = %config.transport.consumer_group,
            topic = %config.transport.request_topic,
            "Query runtime wired"
        );

        Self {
            consumer: transport.consumer,
            handler: Arc::new(QueryClaimHandler::new(Arc::new(pipeline))),
        }
    }

    /// The consumer, for closing it.
    #[must_use]
    pub fn consumer(&self) -> Arc<dyn MessageConsumer> {
        Arc::clone(&self.consumer)
    }

    /// Run the consume loop until the transport context closes.
    ///
    /// Returns `Err(ContextClosed)` after `close`. In-flight messages are
    /// not awaited.
    pub async fn run(self) -> Result<(), TransportError> {
        let handler: Arc<dyn ClaimHandler> = self.handler;
        self.consumer.consume(handler).await
    }
}
