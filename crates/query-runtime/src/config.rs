//! # Runtime Configuration
//!
//! Environment-style configuration, validated at startup. Any missing
//! required value is fatal.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `SERVICE_NAME` | yes | |
//! | `KAFKA_BROKERS` | yes | |
//! | `KAFKA_CONSUMER_GROUP_REQUEST` | yes | |
//! | `KAFKA_CONSUMER_TOPIC_REQUEST` | yes | |
//! | `CONSUMER_NAME` | no | `{SERVICE_NAME}-{pid}` |
//! | `STORE_BACKEND` | no | `mongo` (`mongo` or `memory`) |
//! | `MONGO_HOSTS` | yes | |
//! | `MONGO_USERNAME` | yes | |
//! | `MONGO_PASSWORD` | yes | |
//! | `MONGO_DATABASE` | yes | |
//! | `MONGO_COLLECTION` | yes | |
//! | `MONGO_CONNECTION_TIMEOUT_MS` | no | 3000 |
//! | `MONGO_RESOURCE_TIMEOUT_MS` | no | 5000 |
//! | `RESULT_QUEUE_CAPACITY` | no | 256 |
//! | `USER_SEED_FILE` | no | |
//! | `METRICS_ADDR` | no | `0.0.0.0:9100` (`off` disables) |
//!
//! `KAFKA_BROKERS` entries are Redis Streams addresses: `host:port` or a
//! `redis://` / `rediss://` URL.

use qh_02_action_dispatch::{StoreConfig, DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_RESOURCE_TIMEOUT_MS};
use qh_03_result_publisher::DEFAULT_QUEUE_CAPACITY;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Default bind address of the admin endpoint.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9100";

/// Message transport settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub brokers: Vec<String>,
    pub consumer_group: String,
    pub request_topic: String,
    /// This process's name within the consumer group.
    pub consumer_name: String,
}

/// Which `UserStore` adapter backs the login action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Mongo,
    /// Process-local store, filled only from `USER_SEED_FILE`.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {other:?}, expected mongo or memory")),
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stamped into every result's `sourceService`.
    pub service_name: String,
    pub transport: TransportConfig,
    pub store: StoreConfig,
    pub store_backend: StoreBackend,
    /// Capacity of the queue between dispatch and publication.
    pub result_queue_capacity: usize,
    /// JSON array of user records preloaded into the store.
    pub user_seed_file: Option<PathBuf>,
    /// Where `/health` and `/metrics` are served. `None` disables them.
    pub metrics_addr: Option<SocketAddr>,
}

impl RuntimeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let hosts = |key: &'static str| -> Result<Vec<String>, ConfigError> {
            let hosts = parse_hosts(&required(key)?);
            if hosts.is_empty() {
                return Err(ConfigError::Missing(key));
            }
            Ok(hosts)
        };

        let service_name = required("SERVICE_NAME")?;
        let transport = TransportConfig {
            brokers: hosts("KAFKA_BROKERS")?,
            consumer_group: required("KAFKA_CONSUMER_GROUP_REQUEST")?,
            request_topic: required("KAFKA_CONSUMER_TOPIC_REQUEST")?,
            consumer_name: lookup("CONSUMER_NAME")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("{service_name}-{}", std::process::id())),
        };

        let store = StoreConfig {
            hosts: hosts("MONGO_HOSTS")?,
            username: required("MONGO_USERNAME")?,
            password: required("MONGO_PASSWORD")?,
            database: required("MONGO_DATABASE")?,
            collection: required("MONGO_COLLECTION")?,
            connection_timeout: timeout_or_default(
                "MONGO_CONNECTION_TIMEOUT_MS",
                lookup("MONGO_CONNECTION_TIMEOUT_MS"),
                DEFAULT_CONNECTION_TIMEOUT_MS,
            ),
            resource_timeout: timeout_or_default(
                "MONGO_RESOURCE_TIMEOUT_MS",
                lookup("MONGO_RESOURCE_TIMEOUT_MS"),
                DEFAULT_RESOURCE_TIMEOUT_MS,
            ),
        };

        let result_queue_capacity = match lookup("RESULT_QUEUE_CAPACITY") {
            None => DEFAULT_QUEUE_CAPACITY,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "RESULT_QUEUE_CAPACITY",
                        reason: "must be at least 1".to_string(),
                    })
                }
                Ok(capacity) => capacity,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "RESULT_QUEUE_CAPACITY",
                        reason: e.to_string(),
                    })
                }
            },
        };

        let store_backend = match lookup("STORE_BACKEND").filter(|raw| !raw.is_empty()) {
            None => StoreBackend::default(),
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "STORE_BACKEND",
                reason,
            })?,
        };

        let metrics_addr = match lookup("METRICS_ADDR").filter(|raw| !raw.is_empty()) {
            Some(raw) if raw.trim().eq_ignore_ascii_case("off") => None,
            raw => {
                let raw = raw.unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
                Some(raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                    ConfigError::Invalid {
                        key: "METRICS_ADDR",
                        reason: e.to_string(),
                    }
                })?)
            }
        };

        Ok(Self {
            service_name,
            transport,
            store,
            store_backend,
            result_queue_capacity,
            user_seed_file: lookup("USER_SEED_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            metrics_addr,
        })
    }
}

/// Split a comma-separated host list, dropping blanks.
#[must_use]
pub fn parse_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

fn timeout_or_default(key: &str, raw: Option<String>, default_ms: u64) -> Duration {
    let Some(raw) = raw else {
        debug!(key, default_ms, "Timeout not set, using default");
        return Duration::from_millis(default_ms);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(e) => {
            warn!(
                key,
                value = %raw,
                error = %e,
                default_ms,
                "Unparsable timeout, using default"
            );
            Duration::from_millis(default_ms)
        }
    }
}

/// Result of looking for a `.env` file.
#[derive(Debug)]
pub enum DotenvOutcome {
    Loaded(PathBuf),
    NotFound,
    Failed(String),
}

impl DotenvOutcome {
    /// Log the outcome. Called once the tracing subscriber is installed.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => info!(path = %path.display(), "Loaded .env file"),
            Self::NotFound => debug!("No .env file found, using process environment"),
            Self::Failed(error) => warn!(error = %error, "Failed to load .env file"),
        }
    }
}

fn classify(loaded: Result<PathBuf, dotenv::Error>) -> DotenvOutcome {
    match loaded {
        Ok(path) => DotenvOutcome::Loaded(path),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            DotenvOutcome::NotFound
        }
        Err(e) => DotenvOutcome::Failed(e.to_string()),
    }
}

/// Load `.env` from the working directory or its ancestors.
///
/// Variables already present in the environment are not overridden.
pub fn load_dotenv() -> DotenvOutcome {
    classify(dotenv::dotenv())
}

/// Load a specific env file.
pub fn load_dotenv_from(path: &Path) -> DotenvOutcome {
    classify(dotenv::from_path(path).map(|()| path.to_path_buf()))
}
