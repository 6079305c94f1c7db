//! # Admin Endpoint
//!
//! HTTP router for operators:
//!
//! - `GET /health` - liveness, as JSON
//! - `GET /metrics` - Prometheus text exposition of the query counters

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use query_telemetry::encode_metrics;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Content type of the Prometheus text format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn build_admin_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "query-runtime",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bind the admin listener.
pub async fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Admin endpoint listening");
    Ok(listener)
}

/// Serve the admin router on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, build_admin_router())
        .with_graceful_shutdown(shutdown)
        .await
}
