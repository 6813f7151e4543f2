// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service naming and address resolution.
//!
//! A Service `web` in namespace `default` is published as `web.default.svc`,
//! relative to the managed zone. Normal Services resolve to their cluster IPs.
//! Headless Services, when published at all, resolve to the IPs of the Pods
//! their selector matches.
//!
//! # Pod watches
//!
//! When headless publishing is enabled the controller also watches Pods. The
//! watch mapper calls [`services_selecting_pod`] against the controller's
//! in-memory Service store to find which Services a Pod change affects, without
//! querying the API server.

use crate::cluster::ClusterState;
use crate::constants::{HEADLESS_CLUSTER_IP, SERVICE_NAME_SUFFIX, SERVICE_TYPE_EXTERNAL_NAME};
use crate::record_codec::{classify, AddressFamilies, DnsRecordSet};
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors from resolving a headless Service's addresses.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The Service has no Pod selector, so there is nothing to resolve
    #[error("Service {namespace}/{name} has no pod selector")]
    NoSelector { namespace: String, name: String },

    /// Listing Pods failed
    #[error("Failed to list pods: {0}")]
    Kube(#[from] kube::Error),
}

/// What a Service should look like in the zone, derived fresh on every reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Record name relative to the zone
    pub dns_name: String,
    /// Usable addresses, split by family
    pub addresses: AddressFamilies,
    /// The Service owns a virtual cluster IP
    pub cluster_scoped: bool,
    /// The Service is headless (`spec.clusterIP: None`)
    pub headless: bool,
}

impl ServiceEndpoint {
    /// Build the endpoint from a Service and its resolved addresses.
    ///
    /// Malformed addresses are dropped by [`classify`].
    #[must_use]
    pub fn new<S: AsRef<str>>(service: &Service, addresses: &[S]) -> Self {
        Self {
            dns_name: service_dns_name(
                &service.name_any(),
                &service.namespace().unwrap_or_default(),
            ),
            addresses: classify(addresses),
            cluster_scoped: is_cluster_scoped(service),
            headless: is_headless(service),
        }
    }

    /// One record set per address family present.
    #[must_use]
    pub fn record_sets(&self, ttl: u32) -> Vec<DnsRecordSet> {
        self.addresses.record_sets(&self.dns_name, ttl)
    }
}

/// DNS name for a Service, relative to the zone: `<service>.<namespace>.svc`.
///
/// # Example
///
/// ```
/// use svcdns::resolution::service_dns_name;
///
/// assert_eq!(service_dns_name("api", "prod"), "api.prod.svc");
/// ```
#[must_use]
pub fn service_dns_name(service: &str, namespace: &str) -> String {
    format!("{service}.{namespace}.{SERVICE_NAME_SUFFIX}")
}

/// Returns true if the Service is headless (`spec.clusterIP: None`).
#[must_use]
pub fn is_headless(service: &Service) -> bool {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.cluster_ip.as_deref())
        .is_some_and(|ip| ip == HEADLESS_CLUSTER_IP)
}

/// Returns true if the Service owns a virtual cluster IP: neither headless nor
/// `ExternalName`.
#[must_use]
pub fn is_cluster_scoped(service: &Service) -> bool {
    let external_name = service
        .spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        .is_some_and(|t| t == SERVICE_TYPE_EXTERNAL_NAME);
    !external_name && !is_headless(service)
}

/// The Service's cluster IPs.
///
/// Reads `spec.clusterIPs`, falling back to `spec.clusterIP` for objects that
/// predate dual-stack. `None` and empty entries are excluded.
#[must_use]
pub fn cluster_ip_addresses(service: &Service) -> Vec<String> {
    let Some(spec) = service.spec.as_ref() else {
        return Vec::new();
    };

    let candidates: Vec<&String> = match spec.cluster_ips.as_ref() {
        Some(ips) if !ips.is_empty() => ips.iter().collect(),
        _ => spec.cluster_ip.iter().collect(),
    };

    candidates
        .into_iter()
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty() && *ip != HEADLESS_CLUSTER_IP)
        .map(str::to_string)
        .collect()
}

/// The Service's Pod selector, if it has a non-empty one.
#[must_use]
pub fn service_selector(service: &Service) -> Option<&BTreeMap<String, String>> {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.as_ref())
        .filter(|selector| !selector.is_empty())
}

/// The Pod's IPs: `status.podIPs`, falling back to `status.podIP`.
#[must_use]
pub fn pod_addresses(pod: &Pod) -> Vec<String> {
    let Some(status) = pod.status.as_ref() else {
        return Vec::new();
    };

    let from_list: Vec<String> = status
        .pod_ips
        .iter()
        .flatten()
        .map(|pod_ip| pod_ip.ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .collect();
    if !from_list.is_empty() {
        return from_list;
    }

    status
        .pod_ip
        .iter()
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .collect()
}

/// Returns true if every `key=value` pair of a non-empty selector is in `labels`.
///
/// An empty selector selects nothing, matching how Services treat it.
#[must_use]
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

/// Addresses of every Pod selected by a headless Service, in no particular order.
///
/// # Errors
///
/// Returns [`ResolveError::NoSelector`] if the Service has no selector, or
/// [`ResolveError::Kube`] if listing Pods fails.
pub async fn resolve_headless_addresses(
    cluster: &dyn ClusterState,
    service: &Service,
) -> Result<Vec<String>, ResolveError> {
    let namespace = service.namespace().unwrap_or_default();
    let name = service.name_any();

    let selector = service_selector(service).ok_or_else(|| ResolveError::NoSelector {
        namespace: namespace.clone(),
        name: name.clone(),
    })?;

    let pods = cluster.list_pods(&namespace, selector).await?;
    let addresses: Vec<String> = pods.iter().flat_map(pod_addresses).collect();

    debug!(
        namespace = %namespace,
        name = %name,
        pods = pods.len(),
        addresses = addresses.len(),
        "Resolved headless service addresses"
    );

    Ok(addresses)
}

/// Find every headless Service in the store whose selector matches this Pod.
///
/// Only Services in the Pod's namespace are considered. Normal Services are
/// skipped: their records come from cluster IPs and do not depend on Pods.
#[must_use]
pub fn services_selecting_pod(store: &Store<Service>, pod: &Pod) -> Vec<ObjectRef<Service>> {
    let pod_namespace = pod.namespace().unwrap_or_default();
    let pod_labels = pod.labels();

    store
        .state()
        .iter()
        .filter(|service| service.namespace().unwrap_or_default() == pod_namespace)
        .filter(|service| is_headless(service))
        .filter(|service| {
            service_selector(service).is_some_and(|selector| selector_matches(selector, pod_labels))
        })
        .map(|service| ObjectRef::from_obj(&**service))
        .collect()
}

#[cfg(test)]
#[path = "resolution_tests.rs"]
mod resolution_tests;
