// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the svcdns controller.
//!
//! All metrics use the namespace prefix `svcdns_` and are registered in
//! [`METRICS_REGISTRY`], which [`serve_metrics`] exposes on `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Reconcile outcomes, durations, and requeues
//! - **Zone Metrics** - Calls made to the DNS zone provider
//! - **Finalizer Metrics** - Finalizer writes on Services
//! - **Error Metrics** - Errors by classification
//!
//! # Example
//!
//! ```rust,no_run
//! use svcdns::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("converged", std::time::Duration::from_millis(40));
//! ```

use crate::constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all svcdns metrics
const METRICS_NAMESPACE: &str = "svcdns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of Service reconciliations by outcome
///
/// Labels:
/// - `outcome`: Branch the reconciler took (`converged`, `released`, `skipped_headless`, ...)
///   or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of Service reconciliations by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `status`: `success` or `error`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of Service reconciliations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeues after a failed reconcile
///
/// Labels:
/// - `reason`: Stable error reason (e.g., `ZoneThrottled`, `KubeApiError`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeues after a failed reconcile, by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Zone Metrics
// ============================================================================

/// Total number of zone provider calls
///
/// Labels:
/// - `operation`: `upsert` or `delete`
/// - `record_type`: `A`, `AAAA`, or `TXT`
/// - `status`: `success` or `error`
pub static ZONE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_operations_total"),
        "Total number of zone provider calls by operation, record type, and status",
    );
    let counter = CounterVec::new(opts, &["operation", "record_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Finalizer Metrics
// ============================================================================

/// Total number of finalizer writes
///
/// Labels:
/// - `operation`: `add` or `remove`
pub static FINALIZER_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_finalizer_operations_total"),
        "Total number of finalizer writes on Services by operation",
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

/// Total number of reconcile errors by reason and transience
///
/// Labels:
/// - `error_type`: Stable error reason
/// - `transient`: `true` or `false`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of reconcile errors by reason and transience",
    );
    let counter = CounterVec::new(opts, &["error_type", "transient"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `outcome` - Label of the branch the reconciler took
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&[outcome]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&["success"])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&["error"]).inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&["error"])
        .observe(duration.as_secs_f64());
}

/// Record a requeue scheduled by the error policy
pub fn record_requeue(reason: &str) {
    REQUEUE_TOTAL.with_label_values(&[reason]).inc();
}

/// Record a zone provider call
///
/// # Arguments
/// * `operation` - `upsert` or `delete`
/// * `record_type` - DNS record type
/// * `success` - Whether the call succeeded
pub fn record_zone_operation(operation: &str, record_type: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    ZONE_OPERATIONS_TOTAL
        .with_label_values(&[operation, record_type, status])
        .inc();
}

/// Record a finalizer write (`add` or `remove`)
pub fn record_finalizer_operation(operation: &str) {
    FINALIZER_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `error_type` - Stable error reason
/// * `transient` - Whether the error is expected to clear on retry
pub fn record_error(error_type: &str, transient: bool) {
    let transient = if transient { "true" } else { "false" };
    ERRORS_TOTAL
        .with_label_values(&[error_type, transient])
        .inc();
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

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
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

/// Serve metrics and health endpoints until the process exits.
///
/// # Errors
/// Returns error if the address cannot be bound or the server fails
pub async fn serve_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, path = METRICS_SERVER_PATH, "Metrics server listening");
    axum::serve(listener, metrics_router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let duration = Duration::from_millis(500);

        record_reconciliation_success("converged", duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&["converged"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&["success"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        record_reconciliation_error(Duration::from_millis(250));

        let counter = RECONCILIATION_TOTAL.with_label_values(&["error"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&["error"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_zone_operation() {
        record_zone_operation("upsert", "AAAA", false);

        let counter = ZONE_OPERATIONS_TOTAL.with_label_values(&["upsert", "AAAA", "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("gather_test", Duration::from_millis(100));
        record_requeue("ZoneThrottled");

        let metrics_text = gather_metrics().expect("Gathering metrics should succeed");
        assert!(
            metrics_text.contains("svcdns_reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
        assert!(metrics_text.contains("svcdns_requeues_total"));
    }

    #[tokio::test]
    async fn test_metrics_server_endpoints() {
        record_finalizer_operation("add");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, metrics_router()).await.unwrap();
        });

        let http = reqwest::Client::new();
        let health = http
            .get(format!("http://{addr}{HEALTH_SERVER_PATH}"))
            .send()
            .await
            .unwrap();
        assert!(health.status().is_success());

        let metrics = http
            .get(format!("http://{addr}{METRICS_SERVER_PATH}"))
            .send()
            .await
            .unwrap();
        assert!(metrics.status().is_success());
        let body = metrics.text().await.unwrap();
        assert!(body.contains("svcdns_finalizer_operations_total"));
    }
}
