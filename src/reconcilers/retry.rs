// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry and requeue backoff.
//!
//! Two policies live here:
//!
//! - [`retry_with_backoff`] retries a single operation in place, with
//!   exponential backoff, for as long as its errors are classified as transient.
//!   Used for one-off startup work such as writing the zone version marker.
//! - [`RequeueBackoff`] tracks consecutive failures per object key and yields
//!   the delay after which the controller should try that key again. Reconciles
//!   never retry in place; they fail and get requeued.

use rand::Rng;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::constants::{REQUEUE_INITIAL_INTERVAL_MILLIS, REQUEUE_MAX_INTERVAL_SECS};

/// Maximum total time to spend retrying (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Exponent cap for requeue delays; 2^16 seconds is far past any ceiling.
const MAX_REQUEUE_EXPONENT: u32 = 16;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Initial interval duration
    pub initial_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Maximum total elapsed time
    pub max_elapsed_time: Option<Duration>,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    /// Start time for tracking total elapsed time
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Get the next backoff interval, or None if max elapsed time exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = apply_jitter(interval, self.randomization_factor);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }
}

/// Spread an interval uniformly over `interval ± interval * factor`.
fn apply_jitter(interval: Duration, randomization_factor: f64) -> Duration {
    if randomization_factor == 0.0 {
        return interval;
    }

    let secs = interval.as_secs_f64();
    let delta = secs * randomization_factor;
    let min = secs - delta;
    let max = secs + delta;

    let mut rng = rand::thread_rng();
    let jittered = rng.gen_range(min..=max);

    Duration::from_secs_f64(jittered.max(0.0))
}

/// Create the default exponential backoff for in-place retries.
///
/// # Configuration
///
/// - **Initial interval**: 100ms
/// - **Max interval**: 30 seconds
/// - **Max elapsed time**: 5 minutes total
/// - **Multiplier**: 2.0 (exponential growth)
/// - **Randomization**: ±10% (prevents thundering herd)
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Retry an operation with exponential backoff while its errors are transient.
///
/// # Arguments
///
/// * `operation` - Async function that performs the call
/// * `operation_name` - Human-readable name for logging (e.g., "write version marker")
/// * `is_transient` - Classifies an error as worth retrying
///
/// # Errors
///
/// Returns an error if a non-transient error is encountered or the backoff's
/// maximum elapsed time is exhausted.
///
/// # Example
///
/// ```no_run
/// use svcdns::reconcilers::retry::retry_with_backoff;
/// use svcdns::zone::{memory::InMemoryZone, ZoneClient};
///
/// # async fn example() -> anyhow::Result<()> {
/// let zone = InMemoryZone::new();
/// retry_with_backoff(
///     || zone.set_version_marker("1.1.0", 300),
///     "write version marker",
///     |e: &svcdns::dns_errors::ZoneError| e.is_transient(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    operation: F,
    operation_name: &str,
    is_transient: C,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
    C: Fn(&E) -> bool,
{
    retry_with_backoff_hinted(operation, operation_name, is_transient, |_: &E| None).await
}

/// Like [`retry_with_backoff`], but never sleeps less than the error's own
/// retry hint (e.g. a provider's `Retry-After`).
///
/// The hinted wait is capped at the requeue ceiling.
///
/// # Errors
///
/// Same as [`retry_with_backoff`].
pub async fn retry_with_backoff_hinted<T, E, F, Fut, C, H>(
    mut operation: F,
    operation_name: &str,
    is_transient: C,
    retry_after: H,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
    C: Fn(&E) -> bool,
    H: Fn(&E) -> Option<Duration>,
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
                        "Operation succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_transient(&e) {
                    error!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable error, failing immediately"
                    );
                    return Err(anyhow::anyhow!("{operation_name} failed: {e}"));
                }

                if let Some(duration) = backoff.next_backoff() {
                    let duration = retry_after(&e).map_or(duration, |hint| {
                        duration
                            .max(hint)
                            .min(Duration::from_secs(REQUEUE_MAX_INTERVAL_SECS))
                    });
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable error, will retry"
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
                    return Err(anyhow::anyhow!(
                        "{operation_name} failed after {attempt} attempts: {e}"
                    ));
                }
            }
        }
    }
}

/// Determine if a Kubernetes error is retryable.
///
/// # Retryable Errors
///
/// - **HTTP 409** (Conflict) - the object changed under us; the next attempt
///   reads the current version
/// - **HTTP 429** (Too Many Requests) - Rate limiting
/// - **HTTP 5xx** (Server Errors) - Temporary API server issues
/// - **Service Errors** - Network/connection issues
///
/// Other client errors (4xx) need an operator to fix something.
#[must_use]
pub fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 409 || api_err.code == 429 || (500..600).contains(&api_err.code)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Per-key requeue backoff for the controller's error policy.
///
/// The n-th consecutive failure of a key is requeued after
/// `initial * 2^(n-1)`, capped at `max_interval`, with ±10% jitter.
/// A success resets the key. Keys are independent: a key that keeps failing
/// never delays any other.
///
/// Entries that have not failed for twice the ceiling are dropped on the next
/// failure of any key, so Services deleted while failing do not accumulate.
pub struct RequeueBackoff {
    initial_interval: Duration,
    max_interval: Duration,
    randomization_factor: f64,
    failures: Mutex<HashMap<String, FailureRecord>>,
}

struct FailureRecord {
    count: u32,
    last_failure: Instant,
}

impl Default for RequeueBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(REQUEUE_INITIAL_INTERVAL_MILLIS),
            Duration::from_secs(REQUEUE_MAX_INTERVAL_SECS),
            RANDOMIZATION_FACTOR,
        )
    }
}

impl RequeueBackoff {
    #[must_use]
    pub fn new(initial_interval: Duration, max_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            initial_interval,
            max_interval,
            randomization_factor,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<String, FailureRecord>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failure for `key` and return how long to wait before retrying it.
    pub fn next_delay(&self, key: &str) -> Duration {
        let now = Instant::now();
        let idle_expiry = self.max_interval.saturating_mul(2);

        let attempt = {
            let mut failures = self.failures();
            failures.retain(|_, record| now.duration_since(record.last_failure) < idle_expiry);

            let record = failures.entry(key.to_string()).or_insert(FailureRecord {
                count: 0,
                last_failure: now,
            });
            record.count = record.count.saturating_add(1);
            record.last_failure = now;
            record.count
        };

        let exponent = (attempt - 1).min(MAX_REQUEUE_EXPONENT);
        let base = self
            .initial_interval
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max_interval);

        apply_jitter(base, self.randomization_factor)
    }

    /// Forget the failure history of `key`.
    pub fn reset(&self, key: &str) {
        self.failures().remove(key);
    }

    /// Consecutive failures currently recorded for `key`.
    #[must_use]
    pub fn failure_count(&self, key: &str) -> u32 {
        self.failures().get(key).map_or(0, |record| record.count)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
