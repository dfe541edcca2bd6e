//! Bounded retry for rate-limited remote calls.
//!
//! Only errors that carry an explicit "try again at" hint are retried. The
//! wait is taken from the hint, raised to a floor and refused above a
//! ceiling; everything else propagates on first occurrence.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// An error that may tell the caller how long to back off.
pub trait Retryable {
    /// The wait the error asks for, or `None` if it must not be retried.
    fn retry_wait(&self, now: DateTime<Utc>) -> Option<Duration>;
}

impl Retryable for ApiError {
    fn retry_wait(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_rate_limited() {
            return None;
        }
        let reset_at = self.reset_at()?;
        let millis = (reset_at - now).num_milliseconds();
        Some(Duration::from_millis(millis.max(0) as u64))
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = no retries).
    pub max_retries: u32,
    /// Hints asking for this long or longer are not waited for.
    pub max_wait_ms: u64,
    /// Minimum sleep before a retry, even if the reset already passed.
    pub min_wait_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_wait_ms: 10_000,
            min_wait_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// A policy with the given retry budget and default wait bounds.
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }

    /// How long to sleep before retrying `error`, or `None` to give up.
    ///
    /// The ceiling applies to the hint as given; the sleep itself is rounded
    /// up to whole seconds since reset hints have second granularity.
    pub fn wait_for<E: Retryable>(&self, error: &E, retries_left: u32) -> Option<Duration> {
        if retries_left == 0 {
            return None;
        }
        let indicated = error.retry_wait(Utc::now())?;
        if indicated >= self.max_wait() {
            return None;
        }
        let rounded = Duration::from_secs(indicated.as_millis().div_ceil(1000) as u64);
        Some(rounded.max(self.min_wait()))
    }

    /// Runs `f`, retrying while the error asks for it and budget remains.
    ///
    /// The error that ends the loop is returned unchanged.
    pub async fn execute<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut retries_left = self.max_retries;
        loop {
            match f().await {
                Ok(value) => {
                    if retries_left < self.max_retries {
                        debug!(
                            operation,
                            attempts = self.max_retries - retries_left + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let Some(wait) = self.wait_for(&error, retries_left) else {
                        return Err(error);
                    };
                    warn!(
                        operation,
                        retries_left,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "Rate limited, waiting for reset"
                    );
                    tokio::time::sleep(wait).await;
                    retries_left -= 1;
                }
            }
        }
    }
}
