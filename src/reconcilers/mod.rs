// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for Services.
//!
//! svcdns follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - The controller delivers a Service key whenever it changes
//! 2. **Read** - The reconcile fetches the current Service (never a cached copy)
//! 3. **Converge** - The zone is updated to match the Service's addresses
//! 4. **Track** - A finalizer records that the zone holds records for the Service
//!
//! # Modules
//!
//! - [`service`] - The per-Service state machine
//! - [`finalizers`] - Finalizer add/remove helpers
//! - [`pagination`] - Paginated list helper for large clusters
//! - [`retry`] - Exponential backoff for API calls and requeues
//!
//! # Example
//!
//! ```rust,no_run
//! use svcdns::context::Context;
//! use svcdns::reconcilers::{reconcile_with_deadline, ReconcileOutcome};
//!
//! async fn reconcile(ctx: &Context) -> anyhow::Result<()> {
//!     match reconcile_with_deadline(ctx, "prod", "api").await? {
//!         ReconcileOutcome::Converged { dns_name, .. } => println!("published {dns_name}"),
//!         other => println!("{}", other.as_label()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod finalizers;
pub mod pagination;
pub mod retry;
pub mod service;

pub use service::{reconcile_service, reconcile_with_deadline, ReconcileError, ReconcileOutcome};
