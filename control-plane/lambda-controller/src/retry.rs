//! Retry and wait utilities with exponential backoff and jitter.
//!
//! Every AWS call goes through [`retry_with_backoff`] so throttling and
//! service hiccups are absorbed before they reach the reconciler. Waiting for
//! AWS to converge (a function leaving `Pending`, a deleted mapping
//! disappearing) goes through [`poll_until`], which is always bounded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Configuration for operations that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Delay for the given 1-based attempt, capped and jittered (0.5x..1.5x).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1).min(32) as i32);
        let base = (self.initial_delay.as_secs_f64() * exp)
            .min(self.max_delay.as_secs_f64());
        let jitter = rand::rng().random_range(0.5..1.5);
        Duration::from_secs_f64(base * jitter)
    }
}

/// Execute an async operation, retrying only the failures `retryable` accepts.
///
/// Non-retryable errors are returned immediately; retryable ones are retried
/// with exponential backoff until `max_attempts` is exhausted.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !retryable(&e) => return Err(e),
            Err(e) => {
                if config.max_attempts > 0 && attempt >= config.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                let delay = config.delay_for(attempt);
                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Bounds for a [`poll_until`] wait.
#[derive(Clone, Debug)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The predicate never held within `max_wait`.
    TimedOut { waited: Duration },
    /// The wait was aborted through its cancellation token.
    Cancelled,
    /// The check itself failed.
    Check(E),
}

/// Repeatedly run `check` until `done` accepts its output.
///
/// With `cancel = None` the wait cannot be interrupted; only `max_wait`
/// ends it early. Deletion confirmation relies on this.
pub async fn poll_until<F, Fut, T, E, D>(
    config: &PollConfig,
    operation_name: &str,
    cancel: Option<&CancellationToken>,
    mut check: F,
    done: D,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    D: Fn(&T) -> bool,
{
    let started = tokio::time::Instant::now();
    loop {
        let value = check().await.map_err(PollError::Check)?;
        if done(&value) {
            return Ok(value);
        }
        let waited = started.elapsed();
        if waited >= config.max_wait {
            warn!(operation = %operation_name, waited_ms = waited.as_millis(), "wait timed out");
            return Err(PollError::TimedOut { waited });
        }
        let nap = config.interval.min(config.max_wait - waited);
        debug!(operation = %operation_name, nap_ms = nap.as_millis(), "condition not met; polling again");
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(PollError::Cancelled),
                    _ = tokio::time::sleep(nap) => {}
                }
            }
            None => tokio::time::sleep(nap).await,
        }
    }
}

/// Per-object exponential backoff used by the controller's error policy.
#[derive(Clone)]
pub struct RequeueBackoff {
    config: RetryConfig,
    failures: Arc<Mutex<HashMap<String, u32>>>,
}

impl RequeueBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            config: RetryConfig {
                max_attempts: 0,
                initial_delay: initial,
                max_delay: max,
                backoff_multiplier: 2.0,
            },
            failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record one more failure for `key` and return how long to wait.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut w = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let n = w.entry(key.to_string()).or_insert(0);
        *n = n.saturating_add(1);
        self.config.delay_for(*n)
    }

    pub fn reset(&self, key: &str) {
        let mut w = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        w.remove(key);
    }

    pub fn failures(&self, key: &str) -> u32 {
        let r = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        r.get(key).copied().unwrap_or(0)
    }
}
