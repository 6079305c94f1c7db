//! # Pipeline Harness
//!
//! Starts a complete query runtime on an in-memory broker and offers helpers
//! to send commands and collect results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use qh_02_action_dispatch::{hash_password, InMemoryUserStore};
use query_runtime::{QueryRuntime, RuntimeConfig, RuntimeDeps, Transport};
use shared_bus::{
    InMemoryBroker, InMemoryConsumer, InMemorySession, InboundMessage, MessageConsumer,
    OutboundMessage, TransportError,
};
use shared_types::{Command, CommandResult, LoginCredentials, User};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "rm-userauth-users";
pub const REQUEST_TOPIC: &str = "user.auth.query";
pub const RESPONSE_TOPIC: &str = "user.auth.query.response";
pub const CONSUMER_GROUP: &str = "userauth.query.group";

/// Password of every seeded user.
pub const PASSWORD: &str = "correct";

/// Generous bound for anything involving an Argon2 verification.
pub const RESULT_WAIT: Duration = Duration::from_secs(10);

/// Configuration as the runtime would read it from the environment.
pub fn test_config(extra: &[(&str, &str)]) -> RuntimeConfig {
    let mut vars: HashMap<String, String> = [
        ("SERVICE_NAME", SERVICE_NAME),
        ("KAFKA_BROKERS", "kafka:9092"),
        ("KAFKA_CONSUMER_GROUP_REQUEST", CONSUMER_GROUP),
        ("KAFKA_CONSUMER_TOPIC_REQUEST", REQUEST_TOPIC),
        ("MONGO_HOSTS", "mongo:27017"),
        ("MONGO_USERNAME", "root"),
        ("MONGO_PASSWORD", "root"),
        ("MONGO_DATABASE", "rns_users"),
        ("MONGO_COLLECTION", "users"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    RuntimeConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config is complete")
}

/// A stored user with a hashed password.
pub fn stored_user(id: &str, user_name: &str) -> User {
    User {
        user_id: id.to_string(),
        email: format!("{user_name}@example.com"),
        first_name: "Test".to_string(),
        last_name: user_name.to_string(),
        user_name: user_name.to_string(),
        password: hash_password(PASSWORD).expect("hashing succeeds"),
        role: "user".to_string(),
    }
}

/// A fresh `LoginUser` command addressed to the response topic.
pub fn login_command(user_name: &str, password: &str) -> Command {
    let credentials = LoginCredentials {
        user_name: user_name.to_string(),
        password: password.to_string(),
    };
    Command {
        id: Uuid::new_v4(),
        correlation_id: Uuid::new_v4(),
        action: "LoginUser".to_string(),
        payload: serde_json::to_vec(&credentials).expect("credentials encode"),
        response_topic: RESPONSE_TOPIC.to_string(),
        source: "api-gateway".to_string(),
        source_topic: REQUEST_TOPIC.to_string(),
        issued_at: Utc::now().timestamp(),
        ttl_seconds: 15,
    }
}

/// A running pipeline.
pub struct Harness {
    pub broker: Arc<InMemoryBroker>,
    consumer: Arc<InMemoryConsumer>,
    responses: broadcast::Receiver<InboundMessage>,
    running: JoinHandle<Result<(), TransportError>>,
}

impl Harness {
    /// Start with the users `u1` and `u2` stored.
    pub fn start() -> Self {
        Self::start_with_users(vec![stored_user("1", "u1"), stored_user("2", "u2")])
    }

    pub fn start_with_users(users: Vec<User>) -> Self {
        let config = test_config(&[]);
        let store = InMemoryUserStore::connect(&config.store).expect("store config is valid");
        store.seed(users).expect("seed users are unique");
        Self::start_with(&config, RuntimeDeps::new(Arc::new(store)))
    }

    pub fn start_with(config: &RuntimeConfig, deps: RuntimeDeps) -> Self {
        let broker = Arc::new(InMemoryBroker::new());
        let responses = broker.subscribe(RESPONSE_TOPIC);
        let (transport, consumer) = Transport::in_memory(&config.transport, &broker);
        let runtime = QueryRuntime::start(config, transport, deps);
        let running = tokio::spawn(runtime.run());

        Self {
            broker,
            consumer,
            responses,
            running,
        }
    }

    /// Publish a command on the request topic.
    pub fn send(&self, command: &Command) {
        self.send_raw(command.encode().expect("command encodes"));
    }

    pub fn send_raw(&self, value: Vec<u8>) {
        self.broker
            .publish(&OutboundMessage::new(REQUEST_TOPIC, value))
            .expect("request published");
    }

    pub fn send_tombstone(&self) {
        self.broker
            .publish_tombstone(REQUEST_TOPIC)
            .expect("tombstone published");
    }

    /// Next result on the response topic, if one arrives within `wait`.
    pub async fn next_result(&mut self, wait: Duration) -> Option<CommandResult> {
        let message = timeout(wait, self.responses.recv()).await.ok()?.ok()?;
        let value = message.value?;
        Some(CommandResult::decode(&value).expect("result decodes"))
    }

    /// The result correlated to `command`, skipping unrelated results.
    pub async fn result_for(&mut self, command: &Command, wait: Duration) -> Option<CommandResult> {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let result = self.next_result(remaining).await?;
            if result.correlation_id == command.id {
                return Some(result);
            }
        }
    }

    /// Collect results until `count` arrived or `wait` elapsed.
    pub async fn collect_results(&mut self, count: usize, wait: Duration) -> Vec<CommandResult> {
        let deadline = Instant::now() + wait;
        let mut results = Vec::new();
        while results.len() < count {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match self.next_result(remaining).await {
                Some(result) => results.push(result),
                None => break,
            }
        }
        results
    }

    /// Assert that `rejected` produces no result.
    ///
    /// A routable sentinel is sent after it; once the sentinel's result has
    /// arrived, and a short grace period has passed, no result may correlate
    /// to `rejected`.
    pub async fn assert_no_result(&mut self, rejected: &Command) {
        self.send(rejected);
        self.assert_no_result_for(rejected.id).await;
    }

    /// Like `assert_no_result`, for a message that was already sent.
    pub async fn assert_no_result_for(&mut self, id: Uuid) {
        // Unknown user: routable, answered with 1001.
        let sentinel = login_command("sentinel-nobody", "x");
        self.send(&sentinel);

        let mut seen = Vec::new();
        let deadline = Instant::now() + RESULT_WAIT;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .expect("sentinel result did not arrive");
            let result = self
                .next_result(remaining)
                .await
                .expect("sentinel result did not arrive");
            let done = result.correlation_id == sentinel.id;
            seen.push(result.correlation_id);
            if done {
                break;
            }
        }
        seen.extend(
            self.collect_results(usize::MAX, Duration::from_millis(200))
                .await
                .into_iter()
                .map(|r| r.correlation_id),
        );

        assert!(
            !seen.contains(&id),
            "a result was produced for rejected command {id}"
        );
    }

    /// The consumer session, for acknowledgement checks.
    pub fn session(&self) -> Arc<InMemorySession> {
        self.consumer.session()
    }

    /// Wait until at least `count` messages were acknowledged.
    pub async fn wait_for_acks(&self, count: u64) {
        let session = self.session();
        timeout(RESULT_WAIT, async {
            while session.marked_count() < count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("messages were not acknowledged in time");
    }

    /// Close the consumer and return the consume loop's outcome.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        self.consumer.close();
        timeout(Duration::from_secs(5), self.running)
            .await
            .expect("consume loop did not stop")
            .expect("consume loop panicked")
    }
}
