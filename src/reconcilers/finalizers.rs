// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced Kubernetes resources.
//!
//! The Service reconciler uses a finalizer as its commit marker: it is added
//! before the first record is written and removed only after the records are
//! gone. Patches carry `metadata.resourceVersion`, so patching a stale copy of
//! the object fails with a 409 conflict and the reconcile is retried against the
//! current object.
//!
//! # Example
//!
//! ```rust,no_run
//! use svcdns::reconcilers::finalizers::{ensure_finalizer, has_finalizer};
//! use k8s_openapi::api::core::v1::Service;
//! use kube::Client;
//!
//! # async fn example(client: Client, service: Service) -> Result<(), kube::Error> {
//! const FINALIZER: &str = "dns.azure.com";
//! if !has_finalizer(&service, FINALIZER) {
//!     ensure_finalizer(&client, &service, FINALIZER).await?;
//! }
//! # Ok(())
//! # }
//! ```

use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Returns true if `finalizer` is present on the resource.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|existing| existing == finalizer))
}

/// Build the merge patch that sets the resource's finalizer list.
///
/// The resource's `resourceVersion` is included when known so the API server
/// rejects the patch if the object changed since it was read.
#[must_use]
pub fn finalizer_patch<T: Resource>(resource: &T, finalizers: &[String]) -> Value {
    let mut metadata = json!({ "finalizers": finalizers });
    if let Some(resource_version) = resource.meta().resource_version.as_ref() {
        metadata["resourceVersion"] = json!(resource_version);
    }
    json!({ "metadata": metadata })
}

/// Add a finalizer to a resource if not already present.
///
/// Idempotent: nothing is sent when the finalizer is already there.
///
/// # Errors
///
/// Returns the API error if the patch fails, including a 409 conflict when the
/// resource changed since it was read.
pub async fn ensure_finalizer<T>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        debug!(finalizer = finalizer, "Finalizer already present");
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizer_patch(resource, &finalizers);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        "Added finalizer {} to {} {}/{}",
        finalizer,
        T::kind(&()),
        namespace,
        name
    );
    Ok(())
}

/// Remove a finalizer from a resource.
///
/// Idempotent: nothing is sent when the finalizer is already absent. Other
/// finalizers on the resource are preserved.
///
/// # Errors
///
/// Returns the API error if the patch fails.
pub async fn remove_finalizer<T>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        debug!(finalizer = finalizer, "Finalizer already absent");
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = finalizer_patch(resource, &finalizers);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        "Removed finalizer {} from {} {}/{}",
        finalizer,
        T::kind(&()),
        namespace,
        name
    );
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
