// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # ory-finalizers - stuck finalizer removal for Ory Hydra `OAuth2Client`s
//!
//! Uninstalling Ory Hydra (or its maester controller) before its
//! `OAuth2Client` custom resources leaves finalizers behind that no controller
//! will ever process. Deleting the `oauth2clients.hydra.ory.sh` CRD then hangs.
//!
//! This crate clears those finalizers in one pass:
//!
//! 1. resolve cluster access from kubeconfig data, a file, or inference
//! 2. look up the `CustomResourceDefinition` by name
//! 3. list its instances across all namespaces
//! 4. for each instance with finalizers, re-read it, drop the finalizers and
//!    update it, retrying on version conflicts
//!
//! ## Modules
//!
//! - [`config`] - Sweep configuration and client construction
//! - [`crd_lookup`] - CRD lookup and instance addressing
//! - [`finalizers`] - The sweep itself
//! - [`pagination`] - Paginated list helper
//! - [`retry`] - Transient-error and conflict retry policies
//! - [`errors`] - Error type
//!
//! ## Example
//!
//! ```rust,no_run
//! use ory_finalizers::finalizers::sweep;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let report = sweep(&client, "oauth2clients.hydra.ory.sh", false).await?;
//! for instance in &report.cleared {
//!     println!("cleared {instance}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod crd_lookup;
pub mod errors;
pub mod finalizers;
pub mod pagination;
pub mod retry;

pub use errors::{Result, SweepError};
