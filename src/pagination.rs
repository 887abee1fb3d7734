// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! Lists are fetched in pages to keep memory usage and API server load bounded
//! when a cluster carries many instances.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::errors::Result;
use crate::retry::retry_api_call;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// Each page request goes through [`retry_api_call`], so a transient error
/// mid-listing retries that page only.
///
/// # Arguments
///
/// * `api` - Kubernetes API client for the resource type
/// * `list_params` - Base list parameters (labels, fields, etc.)
///
/// # Example
///
/// ```no_run
/// use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams};
/// use kube::{Api, Client};
/// use ory_finalizers::pagination::list_all_paginated;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::try_default().await?;
/// let gvk = GroupVersionKind::gvk("hydra.ory.sh", "v1alpha1", "OAuth2Client");
/// let ar = ApiResource::from_gvk_with_plural(&gvk, "oauth2clients");
/// let api: Api<DynamicObject> = Api::all_with(client, &ar);
///
/// let clients = list_all_paginated(&api, ListParams::default()).await?;
/// println!("Found {} clients", clients.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if Kubernetes API operations fail.
pub async fn list_all_paginated<K>(api: &Api<K>, mut list_params: ListParams) -> Result<Vec<K>>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let params = list_params.clone();
        let result = retry_api_call(
            || api.list(&params),
            &format!("list page {page_count}"),
        )
        .await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    debug!(
        total_pages = page_count,
        total_items = all_items.len(),
        "Completed paginated list operation"
    );

    Ok(all_items)
}
