// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CustomResourceDefinition` lookup.
//!
//! Instances of the swept CRD are handled untyped, as [`kube::api::DynamicObject`]s.
//! This module turns the CRD definition into the [`ApiResource`] needed to
//! address them.

use crate::constants::CRD_SCOPE_CLUSTER;
use crate::errors::{Result, SweepError};
use crate::retry::retry_api_call;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

/// Addressing information for instances of one CRD.
#[derive(Clone, Debug)]
pub struct CrdTarget {
    /// Group, version, kind and plural of the instances
    pub resource: ApiResource,
    /// `true` if instances live in namespaces
    pub namespaced: bool,
}

impl CrdTarget {
    /// `<plural>.<group>/<version>`, the form used in log and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        describe(&self.resource)
    }

    /// API for listing instances across all namespaces.
    #[must_use]
    pub fn api_all(&self, client: &Client) -> Api<DynamicObject> {
        Api::all_with(client.clone(), &self.resource)
    }

    /// API for reading and writing a single instance in its own namespace.
    #[must_use]
    pub fn api_for(&self, client: &Client, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) if self.namespaced => Api::namespaced_with(client.clone(), ns, &self.resource),
            _ => Api::all_with(client.clone(), &self.resource),
        }
    }
}

/// `<plural>.<group>/<version>` for an [`ApiResource`].
#[must_use]
pub fn describe(resource: &ApiResource) -> String {
    format!("{}.{}/{}", resource.plural, resource.group, resource.version)
}

/// Fetch a `CustomResourceDefinition` by name.
///
/// # Returns
///
/// `Ok(None)` if the CRD is not installed.
///
/// # Errors
///
/// Returns an error for any API failure other than "not found".
pub async fn find_crd(client: &Client, name: &str) -> Result<Option<CustomResourceDefinition>> {
    let api: Api<CustomResourceDefinition> = Api::all(client.clone());

    match retry_api_call(|| api.get(name), &format!("get crd {name}")).await {
        Ok(crd) => Ok(Some(crd)),
        Err(e) if e.is_not_found() => {
            debug!(crd = name, "Couldn't find CRD to remove finalizers from");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Derive how to address instances of `crd`.
///
/// The storage version is preferred since every stored object is readable
/// and writable through it; otherwise the first served version is used.
///
/// # Errors
///
/// Returns [`SweepError::NoServedVersion`] if the CRD declares neither.
pub fn target_for(crd: &CustomResourceDefinition) -> Result<CrdTarget> {
    let spec = &crd.spec;
    let version = spec
        .versions
        .iter()
        .find(|v| v.storage)
        .or_else(|| spec.versions.iter().find(|v| v.served))
        .ok_or_else(|| SweepError::NoServedVersion(crd.name_any()))?;

    let gvk = GroupVersionKind::gvk(&spec.group, &version.name, &spec.names.kind);
    let resource = ApiResource::from_gvk_with_plural(&gvk, &spec.names.plural);

    Ok(CrdTarget {
        resource,
        namespaced: spec.scope != CRD_SCOPE_CLUSTER,
    })
}

#[cfg(test)]
#[path = "crd_lookup_tests.rs"]
mod crd_lookup_tests;
