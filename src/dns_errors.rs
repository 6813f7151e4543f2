// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS zone error types for svcdns.
//!
//! Every failure the zone client can report is a [`ZoneError`]. The zone client
//! never retries on its own; callers use [`ZoneError::is_transient`] to decide
//! how loudly to report a failure, and the controller's requeue policy decides
//! when to try again.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while writing to the DNS zone.
///
/// `record` fields identify the record set the call targeted, formatted as
/// `"<TYPE> <name>"` (for example `"A web.default.svc"`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// The provider throttled the request (HTTP 429)
    #[error("Zone provider throttled request for {record}")]
    Throttled {
        /// Record set the call targeted
        record: String,
        /// Seconds the provider asked us to wait, if it said so
        retry_after_secs: Option<u64>,
    },

    /// The provider is temporarily unable to serve the request (HTTP 5xx)
    #[error("Zone provider unavailable for {record} (HTTP {status_code})")]
    ProviderUnavailable {
        /// Record set the call targeted
        record: String,
        /// HTTP status code returned
        status_code: u16,
    },

    /// The request never reached the provider (DNS, TCP, TLS failures)
    #[error("Connection to zone provider failed for {record}: {reason}")]
    ConnectionFailed {
        /// Record set the call targeted
        record: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The request exceeded the configured HTTP timeout
    #[error("Zone provider request for {record} timed out")]
    Timeout {
        /// Record set the call targeted
        record: String,
    },

    /// Credentials were rejected or lack permission (HTTP 401/403)
    #[error("Zone provider rejected credentials for {record} (HTTP {status_code})")]
    Unauthorized {
        /// Record set the call targeted
        record: String,
        /// HTTP status code returned
        status_code: u16,
    },

    /// The zone (or resource group, or subscription) does not exist
    #[error("Zone not found while writing {record}: {reason}")]
    ZoneNotFound {
        /// Record set the call targeted
        record: String,
        /// Provider response body
        reason: String,
    },

    /// The provider refused the request as malformed or conflicting
    #[error("Zone provider rejected request for {record} (HTTP {status_code}): {reason}")]
    InvalidRequest {
        /// Record set the call targeted
        record: String,
        /// HTTP status code returned
        status_code: u16,
        /// Provider response body
        reason: String,
    },

    /// Any other non-success response
    #[error("Unexpected zone provider response for {record}: {status_code} {reason}")]
    UnexpectedResponse {
        /// Record set the call targeted
        record: String,
        /// HTTP status code returned
        status_code: u16,
        /// Provider response body
        reason: String,
    },

    /// No bearer token could be obtained
    #[error("Failed to obtain zone provider credentials: {reason}")]
    Credentials {
        /// Reason the token source failed
        reason: String,
    },
}

impl ZoneError {
    /// Map a non-success HTTP status from the provider to an error.
    ///
    /// # Arguments
    ///
    /// * `record` - Record set the call targeted (e.g. `"A web.default.svc"`)
    /// * `status_code` - HTTP status code returned by the provider
    /// * `body` - Response body, kept for diagnostics
    /// * `retry_after_secs` - Parsed `Retry-After` header, if present
    #[must_use]
    pub fn from_status(
        record: &str,
        status_code: u16,
        body: String,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let record = record.to_string();
        match status_code {
            429 => Self::Throttled {
                record,
                retry_after_secs,
            },
            401 | 403 => Self::Unauthorized {
                record,
                status_code,
            },
            404 => Self::ZoneNotFound {
                record,
                reason: body,
            },
            400 | 409 | 412 | 422 => Self::InvalidRequest {
                record,
                status_code,
                reason: body,
            },
            500..=599 => Self::ProviderUnavailable {
                record,
                status_code,
            },
            _ => Self::UnexpectedResponse {
                record,
                status_code,
                reason: body,
            },
        }
    }

    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Transient errors include throttling, provider outages, connection failures,
    /// and timeouts. Authorization, missing zones, and malformed requests need an
    /// operator to fix something before a retry can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Throttled { .. }
            | Self::ProviderUnavailable { .. }
            | Self::ConnectionFailed { .. }
            | Self::Timeout { .. } => true,

            Self::Unauthorized { .. }
            | Self::ZoneNotFound { .. }
            | Self::InvalidRequest { .. }
            | Self::UnexpectedResponse { .. }
            | Self::Credentials { .. } => false,
        }
    }

    /// Minimum wait the provider asked for before the next call, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Returns a stable CamelCase reason, used as a log field and metric label.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Throttled { .. } => "ZoneThrottled",
            Self::ProviderUnavailable { .. } => "ZoneProviderUnavailable",
            Self::ConnectionFailed { .. } => "ZoneConnectionFailed",
            Self::Timeout { .. } => "ZoneRequestTimeout",
            Self::Unauthorized { .. } => "ZoneUnauthorized",
            Self::ZoneNotFound { .. } => "ZoneNotFound",
            Self::InvalidRequest { .. } => "ZoneInvalidRequest",
            Self::UnexpectedResponse { .. } => "ZoneUnexpectedResponse",
            Self::Credentials { .. } => "ZoneCredentialsUnavailable",
        }
    }
}
