// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sweep configuration and Kubernetes client construction.
//!
//! Cluster access comes from one of three places:
//!
//! - raw kubeconfig YAML handed over by an installer ([`KubeconfigSource::Inline`])
//! - a kubeconfig file on disk ([`KubeconfigSource::File`])
//! - the usual inference chain: `KUBECONFIG`, `~/.kube/config`, then the
//!   in-cluster service account ([`KubeconfigSource::Infer`])

use crate::constants::DEFAULT_CRD_NAME;
use crate::errors::Result;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::debug;

/// Where the kubeconfig for the target cluster comes from.
#[derive(Clone, Debug, Default)]
pub enum KubeconfigSource {
    /// Kubeconfig YAML content
    Inline(String),
    /// Path to a kubeconfig file
    File(PathBuf),
    /// Standard inference (`KUBECONFIG`, home directory, in-cluster)
    #[default]
    Infer,
}

/// Settings for one finalizer sweep.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// Name of the `CustomResourceDefinition` whose instances are swept
    pub crd_name: String,
    /// Cluster access
    pub kubeconfig: KubeconfigSource,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
    /// Report what would be cleared without writing anything
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            crd_name: DEFAULT_CRD_NAME.to_string(),
            kubeconfig: KubeconfigSource::Infer,
            context: None,
            dry_run: false,
        }
    }
}

impl SweepConfig {
    /// Configuration that sweeps the default CRD using raw kubeconfig YAML.
    #[must_use]
    pub fn from_kubeconfig_data(kubeconfig_data: impl Into<String>) -> Self {
        Self {
            kubeconfig: KubeconfigSource::Inline(kubeconfig_data.into()),
            ..Self::default()
        }
    }

    fn kubeconfig_options(&self) -> KubeConfigOptions {
        KubeConfigOptions {
            context: self.context.clone(),
            ..KubeConfigOptions::default()
        }
    }

    /// Resolve the client configuration without connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read or parsed, names an
    /// unknown context, or if inference finds no usable configuration.
    pub async fn client_config(&self) -> Result<Config> {
        let options = self.kubeconfig_options();
        let config = match &self.kubeconfig {
            KubeconfigSource::Inline(data) => {
                debug!("Loading cluster configuration from inline kubeconfig");
                let kubeconfig = Kubeconfig::from_yaml(data)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            KubeconfigSource::File(path) => {
                debug!(path = %path.display(), "Loading cluster configuration from kubeconfig file");
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            KubeconfigSource::Infer if self.context.is_some() => {
                debug!("Loading cluster configuration from default kubeconfig");
                Config::from_kubeconfig(&options).await?
            }
            KubeconfigSource::Infer => {
                debug!("Inferring cluster configuration");
                Config::infer().await?
            }
        };

        debug!(cluster_url = %config.cluster_url, "Resolved cluster configuration");
        Ok(config)
    }
}

/// Build a Kubernetes client for the configured cluster.
///
/// # Errors
///
/// Returns an error if the configuration cannot be resolved or the client
/// cannot be built from it (e.g. invalid TLS material).
pub async fn client_from_config(config: &SweepConfig) -> Result<Client> {
    let client_config = config.client_config().await?;
    Ok(Client::try_from(client_config)?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
