// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring for Services.
//!
//! The `kube` runtime controller owns the work queue: at most one reconcile is
//! in flight per Service key, queued keys are deduplicated, and distinct
//! Services reconcile concurrently. With headless publishing enabled the
//! controller also watches Pods and maps each Pod event to the headless
//! Services in its namespace whose selector matches the Pod's labels.

use crate::constants::{DNS_SCHEMA_VERSION, REQUEUE_MAX_INTERVAL_SECS};
use crate::context::Context;
use crate::dns_errors::ZoneError;
use crate::metrics;
use crate::reconcilers::retry::retry_with_backoff_hinted;
use crate::reconcilers::{reconcile_with_deadline, ReconcileError};
use crate::resolution::services_selecting_pod;
use crate::zone::ZoneClient;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
    runtime::{controller::Action, watcher::Config as WatcherConfig, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Write the zone's schema version marker.
///
/// Transient failures are retried with exponential backoff, waiting at least
/// as long as a throttling provider asks; anything else aborts startup.
///
/// # Errors
///
/// Returns an error if the marker cannot be written.
pub async fn publish_version_marker(zone: &dyn ZoneClient, ttl: u32) -> Result<()> {
    retry_with_backoff_hinted(
        || zone.set_version_marker(DNS_SCHEMA_VERSION, ttl),
        "publish DNS schema version marker",
        ZoneError::is_transient,
        ZoneError::retry_after,
    )
    .await?;

    info!(version = DNS_SCHEMA_VERSION, "Published DNS schema version marker");
    Ok(())
}

/// Run the Service controller until a shutdown signal is received.
///
/// Watches Services cluster-wide, or in `namespace` when set.
///
/// # Errors
///
/// Returns an error if the controller fails to start.
pub async fn run_service_controller(
    client: Client,
    ctx: Arc<Context>,
    namespace: Option<String>,
) -> Result<()> {
    info!("Starting Service controller");

    let (services, pods): (Api<Service>, Api<Pod>) = match namespace.as_deref() {
        Some(ns) => {
            debug!(namespace = ns, "Watching a single namespace");
            (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            )
        }
        None => (Api::all(client.clone()), Api::all(client)),
    };

    let mut controller = Controller::new(services, WatcherConfig::default());

    if ctx.settings.publish_headless {
        info!("Headless publishing enabled, watching Pods");
        let store = controller.store();
        controller = controller.watches(pods, WatcherConfig::default(), move |pod| {
            services_selecting_pod(&store, &pod)
        });
    }

    controller
        .shutdown_on_signal()
        .run(reconcile_service_wrapper, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller stream error: {}", e);
            }
            futures::future::ready(())
        })
        .await;

    info!("Service controller stopped");
    Ok(())
}

/// Reconcile wrapper for `Service`.
///
/// Records metrics and resets the key's requeue backoff on success.
pub(crate) async fn reconcile_service_wrapper(
    service: Arc<Service>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = service.namespace().unwrap_or_default();
    let name = service.name_any();

    debug!(
        namespace = %namespace,
        name = %name,
        "Reconcile wrapper called for Service"
    );

    match reconcile_with_deadline(&ctx, &namespace, &name).await {
        Ok(outcome) => {
            let duration = start.elapsed();
            metrics::record_reconciliation_success(outcome.as_label(), duration);
            ctx.requeue.reset(&format!("{namespace}/{name}"));

            debug!(
                outcome = outcome.as_label(),
                duration = ?duration,
                "Reconciled Service {}/{}",
                namespace,
                name
            );

            Ok(match ctx.settings.resync_interval {
                Some(interval) => Action::requeue(interval),
                None => Action::await_change(),
            })
        }
        Err(e) => {
            metrics::record_reconciliation_error(start.elapsed());
            Err(e)
        }
    }
}

/// Error policy for the Service controller.
///
/// Every error is requeued with per-key exponential backoff. Transient errors
/// are logged at warn, the rest at error since they need an operator.
pub(crate) fn error_policy(service: Arc<Service>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = format!(
        "{}/{}",
        service.namespace().unwrap_or_default(),
        service.name_any()
    );
    let transient = err.is_transient();
    let reason = err.status_reason();
    let delay = requeue_delay(ctx.requeue.next_delay(&key), err.retry_after());

    if transient {
        warn!(key = %key, reason = reason, retry_in = ?delay, "Reconcile failed: {}", err);
    } else {
        error!(key = %key, reason = reason, retry_in = ?delay, "Reconcile failed: {}", err);
    }

    metrics::record_error(reason, transient);
    metrics::record_requeue(reason);

    Action::requeue(delay)
}

/// Stretch a backoff delay to honor a provider's `Retry-After`, within the requeue ceiling.
fn requeue_delay(backoff: Duration, retry_after: Option<Duration>) -> Duration {
    retry_after
        .map_or(backoff, |hint| backoff.max(hint))
        .min(Duration::from_secs(REQUEUE_MAX_INTERVAL_SECS))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
