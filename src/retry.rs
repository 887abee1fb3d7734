// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for Kubernetes API calls.
//!
//! Two policies live here:
//!
//! - [`retry_api_call`] retries transient API errors (429, 5xx, network) with
//!   exponential backoff and fails fast on permanent errors (other 4xx).
//! - [`retry_on_conflict`] re-runs a whole get-modify-update step while the
//!   API server rejects the write with a version conflict (409).

use crate::constants::{
    BACKOFF_MULTIPLIER, CONFLICT_INTERVAL_MILLIS, CONFLICT_MAX_ATTEMPTS, CONFLICT_MULTIPLIER,
    HTTP_TOO_MANY_REQUESTS, INITIAL_INTERVAL_MILLIS, MAX_ELAPSED_TIME_SECS, MAX_INTERVAL_SECS,
    RANDOMIZATION_FACTOR,
};
use crate::errors::{Result, SweepError};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
/// A backoff stops handing out intervals once either its elapsed-time budget or its
/// retry budget is spent.
#[derive(Debug)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Maximum number of intervals handed out
    pub max_retries: Option<u32>,
    /// Backoff multiplier (2.0 for doubling, 1.0 for a flat schedule)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Jitter only lengthens intervals (`[d, d * (1 + factor)]`)
    pub one_sided_jitter: bool,
    retries: u32,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        max_retries: Option<u32>,
        multiplier: f64,
        randomization_factor: f64,
        one_sided_jitter: bool,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            max_retries,
            multiplier,
            randomization_factor,
            one_sided_jitter,
            retries: 0,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if a budget is exhausted.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        if let Some(max_retries) = self.max_retries {
            if self.retries >= max_retries {
                return None;
            }
        }
        self.retries += 1;

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    /// Number of intervals handed out so far.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let min = if self.one_sided_jitter {
            secs
        } else {
            secs - delta
        };
        let max = secs + delta;

        let jittered = rand::rng().random_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Create default exponential backoff configuration for transient Kubernetes API errors.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
///
/// # Retry Schedule
///
/// Retries occur at approximately 100ms, 200ms, 400ms, 800ms, 1.6s, 3.2s,
/// 6.4s, 12.8s, 25.6s, then every 30s until 5 minutes have elapsed.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        None,
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
        false,
    )
}

/// Create the backoff used when an update loses an optimistic-concurrency race.
///
/// # Configuration
///
/// - **Interval**: 10ms, flat
/// - **Attempts**: 5 in total (4 retries)
/// - **Randomization**: up to +10%, never shorter than 10ms
///
/// This is client-go's `retry.DefaultRetry`.
///
/// Conflicts clear as soon as the writer re-reads the object, so the schedule
/// stays short and flat.
#[must_use]
pub fn conflict_backoff() -> ExponentialBackoff {
    let interval = Duration::from_millis(CONFLICT_INTERVAL_MILLIS);
    ExponentialBackoff::new(
        interval,
        interval,
        None,
        Some(CONFLICT_MAX_ATTEMPTS - 1),
        CONFLICT_MULTIPLIER,
        RANDOMIZATION_FACTOR,
        true,
    )
}

/// Retry a Kubernetes API call with exponential backoff.
///
/// Automatically retries on transient errors (HTTP 429, 5xx, network) and fails
/// immediately on permanent errors (4xx client errors except 429).
///
/// # Arguments
///
/// * `operation` - Async function that performs the API call
/// * `operation_name` - Human-readable name for logging (e.g., "get crd")
///
/// # Errors
///
/// Returns [`SweepError::Kube`] for a non-retryable error, or
/// [`SweepError::RetriesExhausted`] once the backoff budget is spent.
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
/// use kube::{Api, Client};
/// use ory_finalizers::retry::retry_api_call;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::try_default().await?;
/// let api: Api<CustomResourceDefinition> = Api::all(client);
///
/// let crd = retry_api_call(
///     || async { api.get_opt("oauth2clients.hydra.ory.sh").await },
///     "get crd oauth2clients.hydra.ory.sh",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    debug!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable Kubernetes API error"
                    );
                    return Err(SweepError::Kube(e));
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable Kubernetes API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    return Err(SweepError::RetriesExhausted {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Re-run `operation` while it fails with a version conflict.
///
/// `operation` must re-read the object on every call so each attempt writes
/// against the latest `resourceVersion`. Any error other than a conflict is
/// returned immediately. When `backoff` runs out, the last conflict is returned.
///
/// # Errors
///
/// Returns the first non-conflict error, or the final conflict error.
pub async fn retry_on_conflict<T, F, Fut>(
    mut backoff: ExponentialBackoff,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    loop {
        match operation().await {
            Err(e) if e.is_conflict() => match backoff.next_backoff() {
                Some(duration) => {
                    debug!(
                        operation = operation_name,
                        attempt = backoff.retries(),
                        retry_after = ?duration,
                        "Version conflict, re-reading and retrying"
                    );
                    tokio::time::sleep(duration).await;
                }
                None => {
                    warn!(
                        operation = operation_name,
                        attempts = backoff.retries() + 1,
                        "Version conflict persisted, giving up"
                    );
                    return Err(e);
                }
            },
            other => return other,
        }
    }
}

/// Determine if an HTTP status code from the API server is transient.
///
/// # Retryable Status Codes
///
/// - **429** (Too Many Requests) - Rate limiting
/// - **5xx** (Server Errors) - Temporary API server issues
#[must_use]
pub fn is_retryable_status(code: u16) -> bool {
    code == HTTP_TOO_MANY_REQUESTS || (500..600).contains(&code)
}

/// Determine if a Kubernetes error is retryable.
///
/// API errors are classified by status code; service (network/connection)
/// errors are always retryable; everything else (invalid request, serialization,
/// auth setup) is permanent.
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => is_retryable_status(api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
