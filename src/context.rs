// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the Service controller.
//!
//! Every reconcile receives an `Arc<Context>` holding:
//! - The cluster-state collaborator (Services, Pods, finalizers)
//! - The zone client
//! - Per-process reconcile settings
//! - The per-key requeue backoff used by the error policy
//!
//! Both collaborators are trait objects, constructed once in `main` and shared
//! across all concurrent reconciles.

use crate::cluster::ClusterState;
use crate::constants::{DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_RECONCILE_TIMEOUT_SECS};
use crate::reconcilers::retry::RequeueBackoff;
use crate::zone::ZoneClient;
use std::sync::Arc;
use std::time::Duration;

/// Per-process knobs for the Service reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// TTL of every record set written
    pub record_ttl: u32,
    /// Publish headless Services from their Pods' addresses instead of skipping them
    pub publish_headless: bool,
    /// Deadline for a single reconcile
    pub reconcile_timeout: Duration,
    /// Requeue successfully reconciled Services after this interval, if set
    pub resync_interval: Option<Duration>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            record_ttl: DEFAULT_DNS_RECORD_TTL_SECS,
            publish_headless: false,
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            resync_interval: None,
        }
    }
}

/// Shared context passed to every reconcile.
pub struct Context {
    /// Cluster-state collaborator
    pub cluster: Arc<dyn ClusterState>,

    /// DNS zone client
    pub zone: Arc<dyn ZoneClient>,

    /// Reconcile settings
    pub settings: ReconcileSettings,

    /// Consecutive-failure tracking for requeue delays
    pub requeue: RequeueBackoff,
}

impl Context {
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterState>,
        zone: Arc<dyn ZoneClient>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            cluster,
            zone,
            settings,
            requeue: RequeueBackoff::default(),
        }
    }
}
