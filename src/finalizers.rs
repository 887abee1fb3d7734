// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer removal for every instance of a `CustomResourceDefinition`.
//!
//! When an operator is uninstalled before its custom resources, those resources
//! keep finalizers that nothing will ever process, and deleting the CRD hangs.
//! A sweep clears them so that the CRD and its instances can be deleted.
//!
//! # Example
//!
//! ```rust,no_run
//! use ory_finalizers::config::SweepConfig;
//! use ory_finalizers::finalizers::{DefaultFinalizersHandler, FinalizersHandler};
//!
//! # async fn example(kubeconfig_yaml: String) -> Result<(), Box<dyn std::error::Error>> {
//! let handler = DefaultFinalizersHandler::new();
//! let report = handler
//!     .find_and_delete_finalizers(&SweepConfig::from_kubeconfig_data(kubeconfig_yaml))
//!     .await?;
//! println!("cleared {} of {} instances", report.cleared.len(), report.instances);
//! # Ok(())
//! # }
//! ```

use crate::config::{client_from_config, SweepConfig};
use crate::crd_lookup::{find_crd, target_for, CrdTarget};
use crate::errors::{Result, SweepError};
use crate::pagination::list_all_paginated;
use crate::retry::{conflict_backoff, retry_api_call, retry_on_conflict};
use kube::api::{DynamicObject, ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// An instance whose finalizers were (or, in a dry run, would be) removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InstanceRef {
    /// Namespace of the instance, `None` for cluster-scoped resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Name of the instance
    pub name: String,
}

impl std::fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Outcome of sweeping the instances of one resource type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceSweep {
    /// Number of instances listed
    pub listed: usize,
    /// Instances that carried finalizers (in a dry run, that would have been cleared)
    pub cleared: Vec<InstanceRef>,
}

/// Summary of a whole sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Name of the `CustomResourceDefinition` that was looked up
    pub crd_name: String,
    /// `<plural>.<group>/<version>` of the swept instances, if the CRD exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Whether the CRD is installed
    pub crd_found: bool,
    /// Number of instances found across all namespaces
    pub instances: usize,
    /// Instances whose finalizers were removed. In a dry run, the instances
    /// whose finalizers would have been removed; nothing was written.
    pub cleared: Vec<InstanceRef>,
    /// No writes were made
    pub dry_run: bool,
}

impl SweepReport {
    fn crd_missing(crd_name: &str, dry_run: bool) -> Self {
        Self {
            crd_name: crd_name.to_string(),
            resource: None,
            crd_found: false,
            instances: 0,
            cleared: Vec::new(),
            dry_run,
        }
    }
}

/// Finds a CRD and strips the finalizers from all of its instances.
#[async_trait::async_trait]
pub trait FinalizersHandler: Send + Sync {
    /// Connect using `config` and sweep the configured CRD.
    ///
    /// A CRD that is not installed is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be reached, the CRD cannot be
    /// read, or any instance cannot be updated.
    async fn find_and_delete_finalizers(&self, config: &SweepConfig) -> Result<SweepReport>;
}

/// [`FinalizersHandler`] that talks to the cluster named by the config.
#[derive(Clone, Debug, Default)]
pub struct DefaultFinalizersHandler;

impl DefaultFinalizersHandler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl FinalizersHandler for DefaultFinalizersHandler {
    async fn find_and_delete_finalizers(&self, config: &SweepConfig) -> Result<SweepReport> {
        let client = client_from_config(config).await?;
        sweep(&client, &config.crd_name, config.dry_run).await
    }
}

/// Look up `crd_name` and clear the finalizers of all its instances.
///
/// # Errors
///
/// Returns an error if the CRD lookup fails for a reason other than "not
/// found", the CRD has no addressable version, or an instance update fails.
pub async fn sweep(client: &Client, crd_name: &str, dry_run: bool) -> Result<SweepReport> {
    let Some(crd) = find_crd(client, crd_name).await? else {
        return Ok(SweepReport::crd_missing(crd_name, dry_run));
    };

    let target = target_for(&crd)?;
    let outcome = remove_finalizers_from_all_instances(client, &target, dry_run)
        .await
        .inspect_err(|e| {
            error!(
                resource = %target.describe(),
                error = %e,
                "Error while dropping finalizers"
            );
        })?;

    Ok(SweepReport {
        crd_name: crd_name.to_string(),
        resource: Some(target.describe()),
        crd_found: true,
        instances: outcome.listed,
        cleared: outcome.cleared,
        dry_run,
    })
}

/// Clear finalizers on every instance of `target`, across all namespaces.
///
/// Instances are handled one at a time; the first failure stops the sweep.
///
/// # Errors
///
/// Returns [`SweepError::InstanceUpdate`] naming the instance that could not
/// be updated, or the list error if listing fails.
pub async fn remove_finalizers_from_all_instances(
    client: &Client,
    target: &CrdTarget,
    dry_run: bool,
) -> Result<InstanceSweep> {
    let resource = target.describe();
    debug!(resource = %resource, "Dropping finalizers for all custom resources");

    let instances =
        match list_all_paginated(&target.api_all(client), ListParams::default()).await {
            Ok(items) => items,
            Err(e) if e.is_not_found() => {
                debug!(resource = %resource, "Couldn't find any custom resources");
                return Ok(InstanceSweep::default());
            }
            Err(e) => return Err(e),
        };

    let mut outcome = InstanceSweep {
        listed: instances.len(),
        cleared: Vec::new(),
    };

    for instance in &instances {
        let instance_ref = InstanceRef {
            namespace: instance.namespace(),
            name: instance.name_any(),
        };
        let api = target.api_for(client, instance_ref.namespace.as_deref());
        let kind = &target.resource.kind;
        let write_issued = AtomicBool::new(false);

        let cleared = retry_on_conflict(
            conflict_backoff(),
            &format!("clear finalizers of {kind} {instance_ref}"),
            || {
                remove_instance_finalizers(
                    &api,
                    &instance_ref.name,
                    kind,
                    dry_run,
                    &write_issued,
                )
            },
        )
        .await
        .map_err(|e| SweepError::InstanceUpdate {
            resource: resource.clone(),
            name: instance_ref.name.clone(),
            source: Box::new(e),
        })?;

        // A write answered with 5xx may still have been applied; the retried
        // write then conflicts and the re-read finds no finalizers left.
        if cleared || write_issued.load(Ordering::SeqCst) {
            outcome.cleared.push(instance_ref);
        }
    }

    debug!(
        resource = %resource,
        listed = outcome.listed,
        cleared = outcome.cleared.len(),
        "Finished dropping finalizers for custom resources"
    );

    Ok(outcome)
}

/// Re-read one instance and remove all of its finalizers.
///
/// The update carries the `resourceVersion` just read, so a concurrent writer
/// makes it fail with a conflict; callers retry through [`retry_on_conflict`].
/// `write_issued` is set before the update is sent, so callers can tell that
/// this sweep removed the finalizers even when a later attempt finds none.
///
/// # Returns
///
/// `Ok(true)` if the instance had finalizers, `Ok(false)` if it had none or
/// no longer exists.
///
/// # Errors
///
/// Returns an error if the read or the update fails.
pub async fn remove_instance_finalizers(
    api: &Api<DynamicObject>,
    name: &str,
    kind: &str,
    dry_run: bool,
    write_issued: &AtomicBool,
) -> Result<bool> {
    let mut latest = match retry_api_call(|| api.get(name), &format!("get {kind} {name}")).await {
        Ok(obj) => obj,
        Err(e) if e.is_not_found() => {
            debug!(name, kind, "Instance is already gone");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if latest.finalizers().is_empty() {
        return Ok(false);
    }

    debug!(name, kind, finalizers = ?latest.finalizers(), "Found finalizers, deleting");

    if dry_run {
        info!(name, kind, finalizers = ?latest.finalizers(), "Dry run: would remove finalizers");
        return Ok(true);
    }

    latest.metadata.finalizers = None;
    let params = PostParams::default();
    write_issued.store(true, Ordering::SeqCst);
    retry_api_call(
        || api.replace(name, &params, &latest),
        &format!("update {kind} {name}"),
    )
    .await?;

    info!(name, kind, "Removed finalizers");
    Ok(true)
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
