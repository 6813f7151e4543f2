// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! Headless Services can select hundreds of Pods; listing them in pages keeps
//! individual responses small.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// # Arguments
///
/// * `api` - Kubernetes API client for the resource type
/// * `list_params` - Base list parameters (labels, fields, etc.); the page size
///   is overwritten with [`KUBE_LIST_PAGE_SIZE`]
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::api::core::v1::Pod;
/// use kube::{Api, Client, api::ListParams};
/// use svcdns::reconcilers::pagination::list_all_paginated;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Pod> = Api::namespaced(client, "default");
///
/// let pods = list_all_paginated(&api, ListParams::default().labels("app=web")).await?;
/// println!("Found {} pods", pods.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first Kubernetes API error encountered; partial results are discarded.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            kind = %K::kind(&()),
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(continue_token) if !continue_token.is_empty() => {
                list_params.continue_token = Some(continue_token);
            }
            _ => break,
        }
    }

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
