// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the OIDC gateway operator.
//!
//! All metrics carry the namespace prefix `oidc_gateway_`.
//!
//! # Metrics Categories
//!
//! - **Watch Metrics** - Events delivered to the coordinator
//! - **Reconciliation Metrics** - Outcomes and duration of event handling
//! - **Coordination Metrics** - Claims lost to another replica
//! - **Error Metrics** - Error conditions by category
//!
//! The registry is served over HTTP by [`serve_metrics`], next to a liveness endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use oidc_gateway_operator::metrics::record_reconciliation;
//!
//! record_reconciliation("created", "claimed", std::time::Duration::from_millis(20));
//! ```

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};
use axum::{http::StatusCode, routing::get, Router};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "oidc_gateway";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Watch Metrics
// ============================================================================

/// Total number of watch events handed to the coordinator
///
/// Labels:
/// - `event`: `created`, `updated` or `deleted`
pub static WATCH_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_watch_events_total"),
        "Total number of watch events by event kind",
    );
    let counter = CounterVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of handled events by event kind and outcome
///
/// Labels:
/// - `event`: `created`, `updated` or `deleted`
/// - `outcome`: Outcome of the handler (e.g., `claimed`, `provisioned`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of handled events by event kind and outcome",
    );
    let counter = CounterVec::new(opts, &["event", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of event handling in seconds, settle delay included
///
/// Labels:
/// - `event`: `created`, `updated` or `deleted`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of event handling in seconds by event kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Coordination Metrics
// ============================================================================

/// Total number of status writes rejected because another writer got there first
///
/// Labels:
/// - `stage`: Which write lost (`claim`, `pending`, `ready`)
pub static CLAIM_CONFLICTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_claim_conflicts_total"),
        "Total number of conflicting status writes by stage",
    );
    let counter = CounterVec::new(opts, &["stage"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of middleware writes
///
/// Labels:
/// - `operation`: `create` or `patch`
pub static MIDDLEWARE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_middleware_operations_total"),
        "Total number of middleware writes by operation",
    );
    let counter = CounterVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by category
///
/// Labels:
/// - `error_type`: Category of error (`api`, `conflict`, `decode`, `store`, `watch`, ...)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by category",
    );
    let counter = CounterVec::new(opts, &["error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a watch event delivered to the coordinator
pub fn record_watch_event(event: &str) {
    WATCH_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Record the outcome of handling one event
///
/// # Arguments
/// * `event` - Kind of the handled event
/// * `outcome` - Outcome label
/// * `duration` - Time spent handling the event
pub fn record_reconciliation(event: &str, outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[event])
        .observe(duration.as_secs_f64());
}

/// Record a status write that lost an optimistic concurrency race
pub fn record_claim_conflict(stage: &str) {
    CLAIM_CONFLICTS_TOTAL.with_label_values(&[stage]).inc();
}

/// Record a middleware create or patch
pub fn record_middleware_operation(operation: &str) {
    MIDDLEWARE_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `error_type` - Category of error, usually from an error's `category()`
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoints
// ============================================================================

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Router serving `/metrics` and `/healthz`.
pub fn metrics_router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(health_handler))
}

/// Serve [`metrics_router`] until the task is cancelled.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve_metrics(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", listener.local_addr()?);
    axum::serve(listener, metrics_router()).await
}
