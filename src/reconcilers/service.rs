// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service reconciliation logic.
//!
//! Each reconcile reads the current Service and drives the zone towards it:
//!
//! - **Not found**: nothing to do.
//! - **Deleting**: if tracked, delete the Service's records, then remove the
//!   finalizer so Kubernetes can finish the deletion.
//! - **Headless** (unless headless publishing is enabled): skipped. A tracked
//!   Service that turned headless is released like a deleted one.
//! - **Converging**: add the finalizer if missing, then upsert one record set
//!   per address family. A tracked Service with no addresses has its records
//!   withdrawn but keeps the finalizer.
//!
//! The finalizer is the only state the controller persists. It is always
//! written before the first record and removed only after the records are gone,
//! so a crash at any point leaves either a tracked Service or no records at all.

use crate::constants::SERVICE_FINALIZER;
use crate::context::Context;
use crate::dns_errors::ZoneError;
use crate::metrics;
use crate::record_codec::DnsRecordSet;
use crate::reconcilers::finalizers::has_finalizer;
use crate::reconcilers::retry::is_retryable_error;
use crate::resolution::{
    cluster_ip_addresses, is_cluster_scoped, is_headless, resolve_headless_addresses,
    service_dns_name, ResolveError, ServiceEndpoint,
};
use k8s_openapi::api::core::v1::Service;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Which branch a reconcile took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Service no longer exists
    NotFound,
    /// The Service is being deleted and never had records
    DeletedUntracked,
    /// Headless Service, not published
    SkippedHeadless,
    /// Headless Service without a Pod selector
    SkippedNoSelector,
    /// No usable addresses and nothing published
    NoAddresses,
    /// Records match the Service
    Converged {
        dns_name: String,
        ipv4: usize,
        ipv6: usize,
    },
    /// Addresses disappeared; records deleted, finalizer kept
    Withdrawn { dns_name: String },
    /// Records deleted and finalizer removed
    Released { dns_name: String },
}

impl ReconcileOutcome {
    /// Stable snake_case label for logs and metrics.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::DeletedUntracked => "deleted_untracked",
            Self::SkippedHeadless => "skipped_headless",
            Self::SkippedNoSelector => "skipped_no_selector",
            Self::NoAddresses => "no_addresses",
            Self::Converged { .. } => "converged",
            Self::Withdrawn { .. } => "withdrawn",
            Self::Released { .. } => "released",
        }
    }
}

/// Errors that fail a reconcile. Every one of them is requeued with backoff.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Kubernetes API call failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Zone provider call failed
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// The reconcile did not finish within the configured deadline
    #[error("Reconcile of {key} exceeded deadline of {timeout:?}")]
    DeadlineExceeded { key: String, timeout: Duration },
}

impl ReconcileError {
    /// Returns true if the error is expected to clear without operator action.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Kube(e) => is_retryable_error(e),
            Self::Zone(e) => e.is_transient(),
            Self::DeadlineExceeded { .. } => true,
        }
    }

    /// Stable CamelCase reason for logs and metrics.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Kube(kube::Error::Api(e)) if e.code == 409 => "KubeConflict",
            Self::Kube(_) => "KubeApiError",
            Self::Zone(e) => e.status_reason(),
            Self::DeadlineExceeded { .. } => "ReconcileDeadlineExceeded",
        }
    }

    /// Wait the zone provider asked for before the next attempt, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Zone(e) => e.retry_after(),
            Self::Kube(_) | Self::DeadlineExceeded { .. } => None,
        }
    }
}

/// Reconcile one Service, bounded by the configured deadline.
///
/// # Errors
///
/// Returns [`ReconcileError::DeadlineExceeded`] if the deadline expires, or the
/// error of the underlying reconcile.
pub async fn reconcile_with_deadline(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let timeout = ctx.settings.reconcile_timeout;
    tokio::time::timeout(timeout, reconcile_service(ctx, namespace, name))
        .await
        .map_err(|_| ReconcileError::DeadlineExceeded {
            key: format!("{namespace}/{name}"),
            timeout,
        })?
}

/// Reconcile one Service against the zone.
///
/// Always starts from the current object in the cluster. Safe to call any
/// number of times: repeated calls with an unchanged Service make the same
/// idempotent zone writes and no further finalizer writes.
///
/// # Errors
///
/// Returns an error if a Kubernetes or zone call fails. On error the finalizer
/// is left exactly as it was before the failing step.
pub async fn reconcile_service(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let Some(service) = ctx.cluster.get_service(namespace, name).await? else {
        debug!(namespace = namespace, name = name, "Service not found, nothing to do");
        return Ok(ReconcileOutcome::NotFound);
    };

    let dns_name = service_dns_name(name, namespace);
    let tracked = has_finalizer(&service, SERVICE_FINALIZER);

    if service.metadata.deletion_timestamp.is_some() {
        if !tracked {
            debug!(namespace = namespace, name = name, "Untracked Service is being deleted");
            return Ok(ReconcileOutcome::DeletedUntracked);
        }
        info!("Service {}/{} is being deleted, removing {}", namespace, name, dns_name);
        release(ctx, &service, &dns_name).await?;
        return Ok(ReconcileOutcome::Released { dns_name });
    }

    let headless = is_headless(&service);
    if headless && !ctx.settings.publish_headless {
        if tracked {
            info!(
                "Service {}/{} became headless, removing {}",
                namespace, name, dns_name
            );
            release(ctx, &service, &dns_name).await?;
            return Ok(ReconcileOutcome::Released { dns_name });
        }
        debug!(namespace = namespace, name = name, "Skipping headless Service");
        return Ok(ReconcileOutcome::SkippedHeadless);
    }

    let addresses = if headless {
        match resolve_headless_addresses(ctx.cluster.as_ref(), &service).await {
            Ok(addresses) => addresses,
            Err(ResolveError::NoSelector { .. }) => {
                warn!(
                    namespace = namespace,
                    name = name,
                    "Headless Service has no selector, cannot resolve pod addresses"
                );
                if tracked {
                    release(ctx, &service, &dns_name).await?;
                    return Ok(ReconcileOutcome::Released { dns_name });
                }
                return Ok(ReconcileOutcome::SkippedNoSelector);
            }
            Err(ResolveError::Kube(e)) => return Err(e.into()),
        }
    } else if is_cluster_scoped(&service) {
        cluster_ip_addresses(&service)
    } else {
        debug!(namespace = namespace, name = name, "ExternalName Service has no addresses");
        Vec::new()
    };

    let endpoint = ServiceEndpoint::new(&service, &addresses);
    if endpoint.addresses.is_empty() {
        if tracked {
            info!(
                "Service {}/{} has no addresses, withdrawing {}",
                namespace, name, dns_name
            );
            delete_records(ctx, &dns_name).await?;
            return Ok(ReconcileOutcome::Withdrawn { dns_name });
        }
        debug!(namespace = namespace, name = name, "Service has no addresses yet");
        return Ok(ReconcileOutcome::NoAddresses);
    }

    if !tracked {
        ctx.cluster
            .add_finalizer(&service, SERVICE_FINALIZER)
            .await?;
        metrics::record_finalizer_operation("add");
    }

    for record_set in endpoint.record_sets(ctx.settings.record_ttl) {
        upsert_record_set(ctx, &record_set).await?;
    }

    info!(
        dns_name = %dns_name,
        ipv4 = endpoint.addresses.ipv4.len(),
        ipv6 = endpoint.addresses.ipv6.len(),
        "Reconciled Service {}/{}",
        namespace,
        name
    );

    Ok(ReconcileOutcome::Converged {
        dns_name,
        ipv4: endpoint.addresses.ipv4.len(),
        ipv6: endpoint.addresses.ipv6.len(),
    })
}

/// Delete the Service's records, then remove its finalizer.
async fn release(ctx: &Context, service: &Service, dns_name: &str) -> Result<(), ReconcileError> {
    delete_records(ctx, dns_name).await?;
    ctx.cluster
        .remove_finalizer(service, SERVICE_FINALIZER)
        .await?;
    metrics::record_finalizer_operation("remove");
    Ok(())
}

async fn delete_records(ctx: &Context, dns_name: &str) -> Result<(), ZoneError> {
    let result = ctx.zone.delete(dns_name).await;
    metrics::record_zone_operation("delete", "ADDRESS", result.is_ok());
    result
}

async fn upsert_record_set(ctx: &Context, record_set: &DnsRecordSet) -> Result<(), ZoneError> {
    let result = ctx.zone.upsert(record_set).await;
    metrics::record_zone_operation("upsert", record_set.kind().as_str(), result.is_ok());
    result
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
