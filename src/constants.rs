// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the finalizer sweeper.
//!
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Target Resource Constants
// ============================================================================

/// Name of the `CustomResourceDefinition` whose instances are swept by default
pub const DEFAULT_CRD_NAME: &str = "oauth2clients.hydra.ory.sh";

/// `spec.scope` value of a `CustomResourceDefinition` for cluster-scoped resources
pub const CRD_SCOPE_CLUSTER: &str = "Cluster";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for Kubernetes API list operations
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// HTTP status returned when an object no longer exists
pub const HTTP_NOT_FOUND: u16 = 404;

/// HTTP status returned when a write carries a stale `resourceVersion`
pub const HTTP_CONFLICT: u16 = 409;

/// HTTP status returned when the API server is rate limiting
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

// ============================================================================
// Transient Retry Constants
// ============================================================================

/// Maximum total time to spend retrying transient errors (5 minutes)
pub const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval for transient errors (100ms)
pub const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between transient retries (30 seconds)
pub const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
pub const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
pub const RANDOMIZATION_FACTOR: f64 = 0.1;

// ============================================================================
// Conflict Retry Constants
// ============================================================================

/// Interval between get-modify-update attempts after a version conflict (10ms)
pub const CONFLICT_INTERVAL_MILLIS: u64 = 10;

/// Conflict retries use a flat interval
pub const CONFLICT_MULTIPLIER: f64 = 1.0;

/// Total get-modify-update attempts before a conflict is reported
pub const CONFLICT_MAX_ATTEMPTS: u32 = 5;
