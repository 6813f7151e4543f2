// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The capability surface the reconciler needs from the DNS control plane.
//!
//! The reconciler depends only on the [`ZoneClient`] trait. Implementations:
//!
//! - [`azure::AzureZoneClient`] - Azure Private DNS over the ARM REST API
//! - [`memory::InMemoryZone`] - process-local zone for dry runs and tests
//!
//! Every operation is idempotent and none of them retries. Retry policy belongs
//! to the controller so that it can be coordinated with watch-driven requeues.
//!
//! # Example
//!
//! ```rust,no_run
//! use svcdns::record_codec::{build_record_set, RecordKind};
//! use svcdns::zone::{memory::InMemoryZone, ZoneClient};
//!
//! # async fn example() -> Result<(), svcdns::dns_errors::ZoneError> {
//! let zone = InMemoryZone::new();
//! let records = build_record_set("web.default.svc", RecordKind::A, &["10.0.0.5"], 300);
//! zone.upsert(&records).await?;
//! zone.delete("web.default.svc").await?;
//! # Ok(())
//! # }
//! ```

pub mod azure;
pub mod credentials;
pub mod memory;

use crate::constants::VERSION_MARKER_RECORD_NAME;
use crate::dns_errors::ZoneError;
use crate::record_codec::{build_record_set, DnsRecordSet, RecordKind};

/// Idempotent record-set operations on a single DNS zone.
///
/// Implementations must be safe for concurrent use across different names.
#[async_trait::async_trait]
pub trait ZoneClient: Send + Sync {
    /// Create or fully replace the record set for `(record_set.name, record_set.kind())`.
    ///
    /// Calling this twice with the same record set leaves the zone exactly as
    /// calling it once.
    ///
    /// # Errors
    ///
    /// Returns a [`ZoneError`]; see [`ZoneError::is_transient`] for retryability.
    async fn upsert(&self, record_set: &DnsRecordSet) -> Result<(), ZoneError>;

    /// Delete the record set for `(name, kind)`. Deleting a missing set succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`ZoneError`] if the provider refused the delete.
    async fn delete_record_set(&self, name: &str, kind: RecordKind) -> Result<(), ZoneError>;

    /// Delete every address record set (A and AAAA) for `name`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ZoneError`] encountered; later kinds are not attempted.
    async fn delete(&self, name: &str) -> Result<(), ZoneError> {
        for kind in RecordKind::ADDRESS_KINDS {
            self.delete_record_set(name, kind).await?;
        }
        Ok(())
    }

    /// Write the zone-wide schema version TXT record.
    ///
    /// # Errors
    ///
    /// Returns a [`ZoneError`] if the upsert fails.
    async fn set_version_marker(&self, version: &str, ttl: u32) -> Result<(), ZoneError> {
        let record_set =
            build_record_set(VERSION_MARKER_RECORD_NAME, RecordKind::Txt, &[version], ttl);
        self.upsert(&record_set).await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
