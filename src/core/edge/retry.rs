//! Retry Wrapper
//!
//! Generic control-flow wrapper that retries an assertion-bearing check on
//! failure with a sleep, bounded by attempt count. Only an explicit set of
//! expected transient failure kinds is retried; anything else propagates
//! immediately.

use crate::core::api::ApiError;
use crate::core::edge::campaign::CampaignError;
use crate::core::edge::classifier::RevalidatedTooEarly;
use crate::core::edge::clock::Clock;
use crate::core::edge::probe::{ProbeError, ProbeTransportError};
use crate::core::trace::logger;
use std::future::Future;
use std::time::Duration;

/// Failure of one check attempt.
///
/// The first four kinds are the recognized transient failures; `Fatal`
/// carries everything else and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    /// Ordinary assertion failure from scenario logic
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error(transparent)]
    RevalidatedTooEarly(#[from] RevalidatedTooEarly),
    /// The management API has not yet converged to the pushed configuration
    #[error("configuration not yet equal to existing: {0}")]
    NotYetEqual(String),
    #[error("read timeout: {0}")]
    ReadTimeout(String),
    #[error("{0}")]
    Fatal(String),
}

impl CheckFailure {
    /// Whether the retry wrapper may absorb this failure and try again
    pub fn is_transient(&self) -> bool {
        !matches!(self, CheckFailure::Fatal(_))
    }
}

impl From<CampaignError> for CheckFailure {
    fn from(error: CampaignError) -> Self {
        match error {
            CampaignError::EarlyRevalidation(early) => CheckFailure::RevalidatedTooEarly(early),
            CampaignError::Probe(ProbeError::Transport(ProbeTransportError::Timeout(message))) => {
                CheckFailure::ReadTimeout(message)
            }
            other => CheckFailure::Fatal(other.to_string()),
        }
    }
}

impl From<ApiError> for CheckFailure {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::NotYetEqual(message) => CheckFailure::NotYetEqual(message),
            other => CheckFailure::Fatal(other.to_string()),
        }
    }
}

/// Terminal outcome of a retried check
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("check [{check}] failed after {attempts} attempts")]
    AttemptsExhausted {
        check: String,
        attempts: u32,
        #[source]
        last: CheckFailure,
    },
    #[error("check [{check}] hit a non-retryable failure")]
    NotRetryable {
        check: String,
        #[source]
        source: CheckFailure,
    },
}

/// Call `operation` up to `max_attempts` times, sleeping `delay` between
/// attempts.
///
/// Transient failures ([`CheckFailure::is_transient`]) are logged with their
/// reason and retried; any other failure propagates immediately. No sleep
/// occurs after the final attempt. Exhausting all attempts surfaces a failure
/// naming the check and the attempt count.
pub async fn retry_check<T, F, Fut>(
    check: &str,
    max_attempts: u32,
    delay: Duration,
    clock: &dyn Clock,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CheckFailure>>,
{
    let trace = logger();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.is_transient() => {
                trace.retry_attempt(check, attempt, max_attempts, &failure.to_string());
                if attempt >= max_attempts {
                    trace.retry_exhausted(check, attempt);
                    return Err(RetryError::AttemptsExhausted {
                        check: check.to_string(),
                        attempts: attempt,
                        last: failure,
                    });
                }
                clock.sleep(delay).await;
            }
            Err(failure) => {
                return Err(RetryError::NotRetryable {
                    check: check.to_string(),
                    source: failure,
                })
            }
        }
    }
}
