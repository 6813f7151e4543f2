// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster-state collaborator used by the Service reconciler.
//!
//! The reconciler reads Services and Pods and writes finalizers through the
//! [`ClusterState`] trait, so it can be exercised without an API server.

use crate::reconcilers::finalizers;
use crate::reconcilers::pagination::list_all_paginated;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::ListParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Read and finalizer access to cluster objects.
#[async_trait::async_trait]
pub trait ClusterState: Send + Sync {
    /// Fetch the current Service, or `None` if it does not exist.
    async fn get_service(&self, namespace: &str, name: &str)
        -> Result<Option<Service>, kube::Error>;

    /// List every Pod in `namespace` whose labels match `selector`.
    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, kube::Error>;

    /// Add `finalizer` to the Service and persist it. No-op if already present.
    async fn add_finalizer(&self, service: &Service, finalizer: &str) -> Result<(), kube::Error>;

    /// Remove `finalizer` from the Service and persist it. No-op if absent.
    async fn remove_finalizer(&self, service: &Service, finalizer: &str)
        -> Result<(), kube::Error>;
}

/// Render an equality-based label selector, e.g. `app=web,tier=frontend`.
#[must_use]
pub fn label_selector_query(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// [`ClusterState`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterState {
    client: Client,
}

impl KubeClusterState {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ClusterState for KubeClusterState {
    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, kube::Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<Pod>, kube::Error> {
        let query = label_selector_query(selector);
        debug!(namespace = namespace, selector = %query, "Listing pods for service selector");

        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        list_all_paginated(&api, ListParams::default().labels(&query)).await
    }

    async fn add_finalizer(&self, service: &Service, finalizer: &str) -> Result<(), kube::Error> {
        finalizers::ensure_finalizer(&self.client, service, finalizer).await
    }

    async fn remove_finalizer(
        &self,
        service: &Service,
        finalizer: &str,
    ) -> Result<(), kube::Error> {
        finalizers::remove_finalizer(&self.client, service, finalizer).await
    }
}
