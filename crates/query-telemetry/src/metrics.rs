//! Prometheus metrics for the query pipeline.
//!
//! All metrics follow the naming convention: `qh_<stage>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INTAKE
    // =========================================================================

    /// Messages delivered by the transport
    pub static ref COMMANDS_RECEIVED: Counter = Counter::new(
        "qh_intake_messages_received_total",
        "Total messages delivered to the query consumer"
    ).expect("metric creation failed");

    /// Messages dropped by the intake gate
    pub static ref COMMANDS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("qh_intake_commands_rejected_total", "Commands dropped at intake"),
        &["reason"]  // malformed, missing_response_topic, missing_action, expired, empty
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Commands naming an action that is not registered
    pub static ref UNROUTABLE_ACTIONS: Counter = Counter::new(
        "qh_dispatch_unroutable_actions_total",
        "Commands dropped because their action is not registered"
    ).expect("metric creation failed");

    /// Results built, by outcome
    pub static ref RESULTS_EMITTED: CounterVec = CounterVec::new(
        Opts::new("qh_dispatch_results_total", "Results built by the dispatcher"),
        &["action", "outcome"]  // outcome: ok/caller_error/internal_error
    ).expect("metric creation failed");

    // =========================================================================
    // PUBLICATION
    // =========================================================================

    /// Results that could not be encoded
    pub static ref RESULT_ENCODE_FAILURES: Counter = Counter::new(
        "qh_publisher_encode_failures_total",
        "Results dropped because they could not be encoded"
    ).expect("metric creation failed");

    /// Asynchronous transport send failures
    pub static ref PUBLISH_FAILURES: Counter = Counter::new(
        "qh_publisher_send_failures_total",
        "Results the transport failed to publish"
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_RECEIVED.clone()),
        Box::new(COMMANDS_REJECTED.clone()),
        Box::new(UNROUTABLE_ACTIONS.clone()),
        Box::new(RESULTS_EMITTED.clone()),
        Box::new(RESULT_ENCODE_FAILURES.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
