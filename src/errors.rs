// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the finalizer sweeper.
//!
//! Every fallible library operation returns [`SweepError`]. The binary wraps it
//! in `anyhow` for reporting.

use crate::constants::{HTTP_CONFLICT, HTTP_NOT_FOUND};
use thiserror::Error;

/// Errors raised while resolving cluster access or sweeping finalizers.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Kubeconfig data could not be parsed or turned into a client configuration
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// No kubeconfig was given and neither `KUBECONFIG` nor in-cluster config worked
    #[error("failed to infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    /// Kubernetes API call failed with a non-retryable error
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// The `CustomResourceDefinition` declares no version that can be addressed
    #[error("CustomResourceDefinition {0} has no storage or served version")]
    NoServedVersion(String),

    /// Transient errors persisted past the backoff budget
    #[error("{operation} gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        source: kube::Error,
    },

    /// Clearing finalizers of one instance failed
    #[error("removing finalizers from {resource} \"{name}\" failed: {source}")]
    InstanceUpdate {
        resource: String,
        name: String,
        source: Box<SweepError>,
    },
}

impl SweepError {
    /// HTTP status code of the underlying API error, if there is one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(ae)) => Some(ae.code),
            Self::InstanceUpdate { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// `true` if the object (or the whole resource type) does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(HTTP_NOT_FOUND)
    }

    /// `true` if a write was rejected because the `resourceVersion` was stale.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(HTTP_CONFLICT)
    }
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
