//! # Query Telemetry
//!
//! Structured logging and Prometheus counters for the query handler.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use query_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SERVICE_NAME` | `userauth-query` | Service name in logs |
//! | `QH_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `QH_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `QH_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, COMMANDS_RECEIVED, COMMANDS_REJECTED,
    PUBLISH_FAILURES, RESULTS_EMITTED, RESULT_ENCODE_FAILURES, UNROUTABLE_ACTIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    tracing_setup::init_tracing(config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
