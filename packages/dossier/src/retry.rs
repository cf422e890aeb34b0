//! Timeout and retry around network calls.
//!
//! The fetch crates make exactly one request per call. Every caller in
//! this crate goes through [`RetryPolicy::run`] instead, which bounds each
//! attempt with [`tokio::time::timeout`] and retries transient failures
//! with exponential backoff (`backoff`, `2 × backoff`, `4 × backoff`, ...).
//! Client errors other than 429 are permanent and returned at once.

use std::future::Future;
use std::time::Duration;

use pws_dossier_demographics::IndicatorFetchError;
use pws_dossier_extract::FetchError;

use crate::config::NetworkConfig;

/// Largest backoff exponent, so long retry chains cannot overflow.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Errors that may succeed when the same request is sent again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }
}

impl Transient for IndicatorFetchError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed { .. } => false,
        }
    }
}

/// Outcome of a call made through a [`RetryPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum NetworkError<E> {
    /// The last attempt did not finish within the per-attempt timeout.
    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        /// What was being attempted.
        operation: String,
        /// The per-attempt timeout.
        after: Duration,
    },

    /// The call failed with a permanent error, or retries ran out.
    #[error(transparent)]
    Failed(E),
}

impl<E> From<E> for NetworkError<E> {
    fn from(e: E) -> Self {
        Self::Failed(e)
    }
}

/// Per-attempt timeout plus exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on each attempt.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn from_config(config: &NetworkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.backoff.saturating_mul(1 << shift)
    }

    /// Runs `call` until it succeeds, fails permanently, or the retries
    /// are used up. `call` builds a fresh future for every attempt.
    ///
    /// Timeouts count as transient.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Failed`] with the last error, or
    /// [`NetworkError::TimedOut`] if the last attempt timed out.
    #[allow(clippy::future_not_send)]
    pub async fn run<T, E, F, Fut>(&self, operation: &str, call: F) -> Result<T, NetworkError<E>>
    where
        E: Transient + std::fmt::Display,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = self.delay(attempt);
                log::warn!("  retry {attempt}/{} of {operation} in {delay:?}...", self.retries);
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    if !e.is_transient() || attempt >= self.retries {
                        return Err(NetworkError::Failed(e));
                    }
                    log::warn!("  {operation}: transient error: {e}");
                }
                Err(_) => {
                    if attempt >= self.retries {
                        return Err(NetworkError::TimedOut {
                            operation: operation.to_string(),
                            after: self.timeout,
                        });
                    }
                    log::warn!("  {operation}: no response after {:?}", self.timeout);
                }
            }

            attempt += 1;
        }
    }
}
