// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the svcdns controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Kubernetes Constants
// ============================================================================

/// Finalizer placed on every Service whose records have been written to the zone.
///
/// The token is kept stable across releases: renaming it would strand the
/// finalizers already present on live Services.
pub const SERVICE_FINALIZER: &str = "dns.azure.com";

/// `spec.clusterIP` value that marks a Service as headless
pub const HEADLESS_CLUSTER_IP: &str = "None";

/// `spec.type` of Services that alias an external name instead of owning an IP
pub const SERVICE_TYPE_EXTERNAL_NAME: &str = "ExternalName";

/// Page size used when listing Pods for headless Services
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// DNS Naming Constants
// ============================================================================

/// Fixed label appended to `<service>.<namespace>` to form the record name.
///
/// Changing this requires renaming every record already in the zone.
pub const SERVICE_NAME_SUFFIX: &str = "svc";

/// Default TTL for Service records (5 minutes)
pub const DEFAULT_DNS_RECORD_TTL_SECS: u32 = 300;

/// Record name (relative to the zone) of the schema version TXT record
pub const VERSION_MARKER_RECORD_NAME: &str = "dns-version";

/// Kubernetes DNS-based service discovery schema version implemented by this controller
pub const DNS_SCHEMA_VERSION: &str = "1.1.0";

// ============================================================================
// Azure Private DNS Constants
// ============================================================================

/// Default Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Private DNS REST API version used for record set calls
pub const PRIVATE_DNS_API_VERSION: &str = "2024-06-01";

/// Default timeout for a single Azure REST request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Default deadline for a single reconcile, including every zone call it makes
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;

/// First requeue delay after a failed reconcile
pub const REQUEUE_INITIAL_INTERVAL_MILLIS: u64 = 1_000;

/// Ceiling for the requeue delay of a repeatedly failing Service (5 minutes)
pub const REQUEUE_MAX_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint served next to the metrics
pub const HEALTH_SERVER_PATH: &str = "/healthz";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
