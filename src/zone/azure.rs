// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Azure Private DNS zone client.
//!
//! Talks to the Azure Resource Manager REST API directly:
//!
//! ```text
//! PUT|DELETE {endpoint}/subscriptions/{sub}/resourceGroups/{rg}/providers/
//!            Microsoft.Network/privateDnsZones/{zone}/{A|AAAA|TXT}/{name}?api-version=...
//! ```
//!
//! A `PUT` replaces the whole record set, which is what makes upserts idempotent.
//! Requests are single-shot; failures are classified into [`ZoneError`] and
//! handed back to the reconciler.

use super::credentials::TokenSource;
use super::ZoneClient;
use crate::constants::PRIVATE_DNS_API_VERSION;
use crate::dns_errors::ZoneError;
use crate::record_codec::{describe_record, DnsRecordSet, RecordData, RecordKind};
use anyhow::{Context, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Identifies the Azure Private DNS zone to manage.
#[derive(Debug, Clone)]
pub struct AzureZoneConfig {
    /// ARM endpoint, e.g. `https://management.azure.com`
    pub endpoint: String,
    pub subscription_id: String,
    pub resource_group: String,
    /// Zone name, e.g. `cluster.example.internal`
    pub zone_name: String,
    /// Per-request timeout
    pub http_timeout: Duration,
}

/// Request body of a record set `PUT`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecordSetBody {
    properties: RecordSetProperties,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct RecordSetProperties {
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    a_records: Option<Vec<ARecordBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aaaa_records: Option<Vec<AaaaRecordBody>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    txt_records: Option<Vec<TxtRecordBody>>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ARecordBody {
    ipv4_address: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct AaaaRecordBody {
    ipv6_address: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct TxtRecordBody {
    value: Vec<String>,
}

impl From<&DnsRecordSet> for RecordSetBody {
    fn from(record_set: &DnsRecordSet) -> Self {
        let mut properties = RecordSetProperties {
            ttl: record_set.ttl,
            a_records: None,
            aaaa_records: None,
            txt_records: None,
        };

        match &record_set.data {
            RecordData::A(ips) => {
                properties.a_records = Some(
                    ips.iter()
                        .map(|ip| ARecordBody {
                            ipv4_address: ip.to_string(),
                        })
                        .collect(),
                );
            }
            RecordData::Aaaa(ips) => {
                properties.aaaa_records = Some(
                    ips.iter()
                        .map(|ip| AaaaRecordBody {
                            ipv6_address: ip.to_string(),
                        })
                        .collect(),
                );
            }
            RecordData::Txt(values) => {
                properties.txt_records = Some(
                    values
                        .iter()
                        .map(|value| TxtRecordBody {
                            value: vec![value.clone()],
                        })
                        .collect(),
                );
            }
        }

        Self { properties }
    }
}

/// [`ZoneClient`] backed by the Azure Private DNS REST API.
///
/// Cheap to share: the underlying `reqwest::Client` pools connections and is
/// safe for concurrent use.
pub struct AzureZoneClient {
    http: HttpClient,
    zone_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl AzureZoneClient {
    /// Build a client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid base URL or the HTTP
    /// client cannot be built.
    pub fn new(config: &AzureZoneConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client for Azure Private DNS")?;
        Self::with_http_client(http, config, tokens)
    }

    /// Build a client on top of an existing HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid base URL.
    pub fn with_http_client(
        http: HttpClient,
        config: &AzureZoneConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let mut zone_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid ARM endpoint: {}", config.endpoint))?;

        zone_url
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("ARM endpoint cannot be a base URL: {}", config.endpoint))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                config.subscription_id.as_str(),
                "resourceGroups",
                config.resource_group.as_str(),
                "providers",
                "Microsoft.Network",
                "privateDnsZones",
                config.zone_name.as_str(),
            ]);

        debug!(zone_url = %zone_url, "Configured Azure Private DNS zone client");

        Ok(Self {
            http,
            zone_url,
            tokens,
        })
    }

    /// Full URL of the `(name, kind)` record set, including the API version.
    #[must_use]
    pub fn record_set_url(&self, name: &str, kind: RecordKind) -> Url {
        let mut url = self.zone_url.clone();
        // zone_url already accepted path segments in the constructor
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(kind.as_str()).push(name);
        }
        url.query_pairs_mut()
            .append_pair("api-version", PRIVATE_DNS_API_VERSION);
        url
    }

    /// Send a single request for `(name, kind)` and classify the response.
    async fn send(
        &self,
        method: Method,
        name: &str,
        kind: RecordKind,
        body: Option<&RecordSetBody>,
    ) -> Result<StatusCode, ZoneError> {
        let record = describe_record(name, kind);
        let url = self.record_set_url(name, kind);
        let token = self.tokens.bearer_token().await?;

        debug!(
            method = %method,
            url = %url,
            body = ?body,
            "HTTP API request to Azure Private DNS"
        );

        let mut request = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ZoneError::Timeout {
                    record: record.clone(),
                }
            } else {
                ZoneError::ConnectionFailed {
                    record: record.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(status);
        }
        if method == Method::DELETE && status == StatusCode::NOT_FOUND {
            debug!(record = %record, "Record set already absent");
            return Ok(status);
        }

        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ZoneError::from_status(
            &record,
            status.as_u16(),
            error_text,
            retry_after_secs,
        ))
    }
}

#[async_trait::async_trait]
impl ZoneClient for AzureZoneClient {
    async fn upsert(&self, record_set: &DnsRecordSet) -> Result<(), ZoneError> {
        let body = RecordSetBody::from(record_set);
        let status = self
            .send(Method::PUT, &record_set.name, record_set.kind(), Some(&body))
            .await?;

        info!(
            record = %record_set.describe(),
            values = ?record_set.values(),
            ttl = record_set.ttl,
            status = %status,
            "Upserted record set"
        );
        Ok(())
    }

    async fn delete_record_set(&self, name: &str, kind: RecordKind) -> Result<(), ZoneError> {
        let status = self.send(Method::DELETE, name, kind, None).await?;

        info!(
            record = %describe_record(name, kind),
            status = %status,
            "Deleted record set"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "azure_tests.rs"]
mod azure_tests;
