// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests.

use crate::cluster::ClusterState;
use crate::reconcilers::finalizers::has_finalizer;
use crate::resolution::selector_matches;
use crate::zone::memory::InMemoryZone;
use k8s_openapi::api::core::v1::{Pod, PodIP, PodStatus, Service, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use k8s_openapi::jiff::Timestamp;
use kube::ResourceExt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A finalizer write observed by [`FakeCluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    /// `zone_calls_before` is how many zone calls had been made when the write happened
    AddFinalizer {
        service: String,
        zone_calls_before: usize,
    },
    RemoveFinalizer {
        service: String,
        zone_calls_before: usize,
    },
}

#[derive(Default)]
struct FakeState {
    services: BTreeMap<(String, String), Service>,
    pods: Vec<Pod>,
    calls: Vec<ClusterCall>,
    get_failures: VecDeque<kube::Error>,
    list_failures: VecDeque<kube::Error>,
    add_failures: VecDeque<kube::Error>,
    remove_failures: VecDeque<kube::Error>,
}

/// In-memory [`ClusterState`].
///
/// Finalizer writes are applied to the stored Service. Removing the last
/// finalizer from a Service that is being deleted removes it, like the API
/// server does.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
    zone: Option<Arc<InMemoryZone>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record, on every finalizer write, how many calls `zone` had seen.
    pub fn observing(zone: Arc<InMemoryZone>) -> Self {
        Self {
            state: Mutex::default(),
            zone: Some(zone),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn zone_calls(&self) -> usize {
        self.zone.as_ref().map_or(0, |zone| zone.calls().len())
    }

    pub fn put_service(&self, service: Service) {
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        self.lock().services.insert(key, service);
    }

    pub fn put_pod(&self, pod: Pod) {
        self.lock().pods.push(pod);
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.lock()
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.lock().calls.clone()
    }

    pub fn fail_next_get(&self, error: kube::Error) {
        self.lock().get_failures.push_back(error);
    }

    pub fn fail_next_list(&self, error: kube::Error) {
        self.lock().list_failures.push_back(error);
    }

    pub fn fail_next_add(&self, error: kube::Error) {
        self.lock().add_failures.push_back(error);
    }

    pub fn fail_next_remove(&self, error: kube::Error) {
        self.lock().remove_failures.push_back(error);
    }
}

#[async_trait::async_trait]
impl ClusterState for FakeCluster {
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, kube::Error> {
        let mut state = self.lock();
        if let Some(error) = state.get_failures.pop_front() {
            return Err(error);
        }
        Ok(state
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, kube::Error> {
        let mut state = self.lock();
        if let Some(error) = state.list_failures.pop_front() {
            return Err(error);
        }
        Ok(state
            .pods
            .iter()
            .filter(|pod| pod.namespace().as_deref() == Some(namespace))
            .filter(|pod| selector_matches(selector, pod.labels()))
            .cloned()
            .collect())
    }

    async fn add_finalizer(&self, service: &Service, finalizer: &str) -> Result<(), kube::Error> {
        let zone_calls_before = self.zone_calls();
        let mut state = self.lock();
        if let Some(error) = state.add_failures.pop_front() {
            return Err(error);
        }
        if has_finalizer(service, finalizer) {
            return Ok(());
        }

        state.calls.push(ClusterCall::AddFinalizer {
            service: service.name_any(),
            zone_calls_before,
        });
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        if let Some(stored) = state.services.get_mut(&key) {
            stored
                .metadata
                .finalizers
                .get_or_insert_with(Vec::new)
                .push(finalizer.to_string());
        }
        Ok(())
    }

    async fn remove_finalizer(
        &self,
        service: &Service,
        finalizer: &str,
    ) -> Result<(), kube::Error> {
        let zone_calls_before = self.zone_calls();
        let mut state = self.lock();
        if let Some(error) = state.remove_failures.pop_front() {
            return Err(error);
        }
        if !has_finalizer(service, finalizer) {
            return Ok(());
        }

        state.calls.push(ClusterCall::RemoveFinalizer {
            service: service.name_any(),
            zone_calls_before,
        });
        let key = (service.namespace().unwrap_or_default(), service.name_any());
        let mut gone = false;
        if let Some(stored) = state.services.get_mut(&key) {
            if let Some(finalizers) = stored.metadata.finalizers.as_mut() {
                finalizers.retain(|f| f != finalizer);
            }
            gone = stored.metadata.deletion_timestamp.is_some()
                && stored.finalizers().is_empty();
        }
        if gone {
            state.services.remove(&key);
        }
        Ok(())
    }
}

/// A normal ClusterIP Service with the given cluster IPs.
pub fn cluster_ip_service(name: &str, namespace: &str, cluster_ips: &[&str]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: cluster_ips.first().map(|ip| (*ip).to_string()),
            cluster_ips: Some(cluster_ips.iter().map(|ip| (*ip).to_string()).collect()),
            selector: Some(labels(&[("app", name)])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A headless Service selecting Pods by `selector`.
pub fn headless_service(name: &str, namespace: &str, selector: &[(&str, &str)]) -> Service {
    let mut service = cluster_ip_service(name, namespace, &["None"]);
    if let Some(spec) = service.spec.as_mut() {
        spec.selector = if selector.is_empty() {
            None
        } else {
            Some(labels(selector))
        };
    }
    service
}

/// Mark the Service as carrying `finalizer`.
pub fn with_finalizer(mut service: Service, finalizer: &str) -> Service {
    service
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    service
}

/// Mark the Service as being deleted.
pub fn deleting(mut service: Service) -> Service {
    service.metadata.deletion_timestamp = Some(Time(Timestamp::now()));
    service
}

/// A running Pod with the given labels and IPs.
pub fn pod(name: &str, namespace: &str, pod_labels: &[(&str, &str)], ips: &[&str]) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels(pod_labels)),
            ..Default::default()
        },
        status: Some(PodStatus {
            pod_ip: ips.first().map(|ip| (*ip).to_string()),
            pod_ips: Some(
                ips.iter()
                    .map(|ip| PodIP {
                        ip: (*ip).to_string(),
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect()
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(
        kube::error::Status::failure(&format!("{reason} from test"), reason)
            .with_code(code)
            .boxed(),
    )
}
