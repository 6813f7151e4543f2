// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # svcdns - Kubernetes Service to Azure Private DNS controller
//!
//! svcdns watches Kubernetes Services and publishes each one's addresses as
//! `A`/`AAAA` record sets named `<service>.<namespace>.svc` in an Azure
//! Private DNS zone. A finalizer on the Service guarantees its records are
//! deleted before the Service disappears.
//!
//! ## Modules
//!
//! - [`record_codec`] - Record set types and address classification
//! - [`zone`] - Zone client trait with Azure and in-memory implementations
//! - [`resolution`] - Service to DNS name and address resolution
//! - [`cluster`] - Cluster-state access (Services, Pods, finalizers)
//! - [`reconcilers`] - The per-Service reconcile state machine
//! - [`controller`] - Controller wiring, error policy, startup marker
//! - [`config`] - Command line and environment configuration
//! - [`metrics`] - Prometheus metrics and the metrics/health server
//!
//! ## Example
//!
//! ```rust,no_run
//! use svcdns::context::{Context, ReconcileSettings};
//! use svcdns::cluster::KubeClusterState;
//! use svcdns::reconcilers::reconcile_service;
//! use svcdns::zone::memory::InMemoryZone;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = kube::Client::try_default().await?;
//! let ctx = Context::new(
//!     Arc::new(KubeClusterState::new(client)),
//!     Arc::new(InMemoryZone::new()),
//!     ReconcileSettings::default(),
//! );
//!
//! let outcome = reconcile_service(&ctx, "default", "web").await?;
//! println!("{}", outcome.as_label());
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod dns_errors;
pub mod metrics;
pub mod reconcilers;
pub mod record_codec;
pub mod resolution;
pub mod zone;

#[cfg(test)]
mod testing;
