// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Every flag can also be set through the environment variable shown in
//! `--help`. The zone is identified by subscription, resource group, and zone
//! name; the legacy spellings `--resourcegroup` and `--zoneName` are accepted.

use crate::constants::{
    DEFAULT_ARM_ENDPOINT, DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_RECONCILE_TIMEOUT_SECS, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
};
use crate::context::ReconcileSettings;
use crate::zone::azure::AzureZoneConfig;
use crate::zone::credentials::{StaticToken, TokenFile, TokenSource};
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors detected before the controller starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{flag} must not be empty")]
    Empty { flag: &'static str },

    #[error("{flag} must be greater than zero")]
    Zero { flag: &'static str },

    #[error("Invalid {flag}: {reason}")]
    Invalid { flag: &'static str, reason: String },

    #[error("One of --access-token or --access-token-file is required (or use --dry-run)")]
    MissingCredentials,

    #[error("--access-token and --access-token-file are mutually exclusive")]
    ConflictingCredentials,
}

/// Publish Kubernetes Service addresses into an Azure Private DNS zone.
#[derive(Parser, Debug, Clone)]
#[command(name = "svcdns", author, version, about, long_about = None)]
pub struct Config {
    /// Azure subscription ID that owns the zone
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: String,

    /// Resource group that holds the zone
    #[arg(long, env = "AZURE_RESOURCE_GROUP", alias = "resourcegroup")]
    pub resource_group: String,

    /// Private DNS zone name, e.g. cluster.example.internal
    #[arg(long, env = "AZURE_DNS_ZONE", alias = "zoneName")]
    pub zone_name: String,

    /// Azure Resource Manager endpoint
    #[arg(long, env = "AZURE_ARM_ENDPOINT", default_value = DEFAULT_ARM_ENDPOINT)]
    pub arm_endpoint: String,

    /// Bearer token for the Azure Resource Manager API
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File holding the bearer token; re-read on every request
    #[arg(long, env = "AZURE_ACCESS_TOKEN_FILE")]
    pub access_token_file: Option<PathBuf>,

    /// TTL in seconds of every record set written
    #[arg(long, env = "SVCDNS_RECORD_TTL", default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
    pub record_ttl: u32,

    /// Publish headless Services using the addresses of their Pods
    #[arg(long, env = "SVCDNS_PUBLISH_HEADLESS")]
    pub publish_headless: bool,

    /// Only watch Services in this namespace (default: all namespaces)
    #[arg(long, env = "SVCDNS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Deadline in seconds for a single reconcile
    #[arg(long, env = "SVCDNS_RECONCILE_TIMEOUT_SECS", default_value_t = DEFAULT_RECONCILE_TIMEOUT_SECS)]
    pub reconcile_timeout_secs: u64,

    /// Timeout in seconds for a single zone provider request
    #[arg(long, env = "SVCDNS_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,

    /// Re-reconcile healthy Services after this many seconds (default: only on change)
    #[arg(long, env = "SVCDNS_RESYNC_INTERVAL_SECS")]
    pub resync_interval_secs: Option<u64>,

    /// Port of the metrics and health server
    #[arg(long, env = "SVCDNS_METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Bind address of the metrics and health server
    #[arg(long, env = "SVCDNS_METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Write records to an in-memory zone instead of Azure
    #[arg(long, env = "SVCDNS_DRY_RUN")]
    pub dry_run: bool,
}

impl Config {
    /// Check the configuration for values clap cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (flag, value) in [
            ("--subscription", &self.subscription),
            ("--resource-group", &self.resource_group),
            ("--zone-name", &self.zone_name),
            ("--arm-endpoint", &self.arm_endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty { flag });
            }
        }

        if let Some(namespace) = self.namespace.as_deref() {
            if namespace.trim().is_empty() {
                return Err(ConfigError::Empty { flag: "--namespace" });
            }
        }

        url::Url::parse(&self.arm_endpoint).map_err(|e| ConfigError::Invalid {
            flag: "--arm-endpoint",
            reason: e.to_string(),
        })?;

        for (flag, value) in [
            ("--record-ttl", u64::from(self.record_ttl)),
            ("--reconcile-timeout-secs", self.reconcile_timeout_secs),
            ("--http-timeout-secs", self.http_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { flag });
            }
        }
        if self.resync_interval_secs == Some(0) {
            return Err(ConfigError::Zero {
                flag: "--resync-interval-secs",
            });
        }

        self.metrics_addr()?;

        if !self.dry_run {
            match (&self.access_token, &self.access_token_file) {
                (Some(_), Some(_)) => return Err(ConfigError::ConflictingCredentials),
                (None, None) => return Err(ConfigError::MissingCredentials),
                (Some(token), None) if token.trim().is_empty() => {
                    return Err(ConfigError::Empty {
                        flag: "--access-token",
                    })
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Coordinates of the managed zone.
    #[must_use]
    pub fn zone_config(&self) -> AzureZoneConfig {
        AzureZoneConfig {
            endpoint: self.arm_endpoint.clone(),
            subscription_id: self.subscription.clone(),
            resource_group: self.resource_group.clone(),
            zone_name: self.zone_name.clone(),
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    #[must_use]
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            record_ttl: self.record_ttl,
            publish_headless: self.publish_headless,
            reconcile_timeout: Duration::from_secs(self.reconcile_timeout_secs),
            resync_interval: self.resync_interval_secs.map(Duration::from_secs),
        }
    }

    /// Token source for the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] if neither a token nor a
    /// token file was configured.
    pub fn token_source(&self) -> Result<Arc<dyn TokenSource>, ConfigError> {
        match (&self.access_token, &self.access_token_file) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingCredentials),
            (Some(token), None) => Ok(Arc::new(StaticToken::new(token.clone()))),
            (None, Some(path)) => Ok(Arc::new(TokenFile::new(path.clone()))),
            (None, None) => Err(ConfigError::MissingCredentials),
        }
    }

    /// Socket address of the metrics and health server.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the bind address is not an IP address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .metrics_bind_address
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                flag: "--metrics-bind-address",
                reason: e.to_string(),
            })?;
        Ok(SocketAddr::new(ip, self.metrics_port))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
