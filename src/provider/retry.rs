//! Retry with exponential backoff for transient provider failures
//!
//! Each attempt ends in exactly one [`AttemptOutcome`]:
//!
//! - `Success`: the text is returned
//! - `Fatal`: the error is returned at once, no further attempts
//! - `Transient`: sleep `base * 2^(n-1)` before retry `n`, unless the attempt
//!   budget is spent, in which case [`RetryError::Exhausted`] is returned

use super::{CompletionClient, CompletionRequest, ProviderError};
use crate::config::{CallPath, RetryConfig};
use crate::error::AppError;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Ceiling for a single backoff sleep
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// How one provider attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Transient,
    Fatal,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Transient => "transient",
            AttemptOutcome::Fatal => "fatal",
        }
    }

    fn of(result: &Result<String, ProviderError>) -> Self {
        match result {
            Ok(_) => AttemptOutcome::Success,
            Err(e) if e.is_transient() => AttemptOutcome::Transient,
            Err(_) => AttemptOutcome::Fatal,
        }
    }
}

/// Attempt budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts(),
            Duration::from_millis(config.base_delay_ms()),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep before retry number `retry` (1-indexed): `base * 2^(retry-1)`,
    /// capped at [`MAX_BACKOFF_MS`]
    ///
    /// With the default 500 ms base: 500 ms, 1000 ms, 2000 ms, ...
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(MAX_BACKOFF_MS);
        let delay_ms = base_ms
            .saturating_mul(2_u64.saturating_pow(exponent))
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// A successful completion and the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub attempts: u32,
}

/// Why a retried call gave up
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// A non-retryable error; returned on the attempt it occurred
    #[error("provider failed on attempt {attempt}: {error}")]
    Fatal { attempt: u32, error: ProviderError },

    /// Every attempt failed transiently
    #[error("provider still failing after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: ProviderError,
    },
}

impl From<RetryError> for AppError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Fatal { error, .. } => AppError::Provider(error),
            RetryError::Exhausted {
                attempts,
                last_error,
            } => AppError::ServiceBusy {
                attempts,
                last_error: last_error.to_string(),
            },
        }
    }
}

/// Wraps a [`CompletionClient`] with the retry policy and attempt metrics
#[derive(Clone)]
pub struct RetryingClient {
    inner: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
    metrics: Arc<Metrics>,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn CompletionClient>, policy: RetryPolicy, metrics: Arc<Metrics>) -> Self {
        Self {
            inner,
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn call_path(&self) -> CallPath {
        self.inner.call_path()
    }

    /// Run `request` until it succeeds, fails fatally, or the attempt budget
    /// is spent
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RetryError> {
        let call_path = self.inner.call_path();
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = self.inner.complete(request).await;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let outcome = AttemptOutcome::of(&result);

            self.metrics.observe("record_attempt", |m| {
                m.record_attempt(call_path, outcome)
            });
            self.metrics.observe("record_provider_latency", |m| {
                m.record_provider_latency(call_path, elapsed_ms)
            });

            match result {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(
                            call_path = call_path.as_str(),
                            attempt,
                            "Provider call succeeded after retry"
                        );
                    }
                    return Ok(Completion {
                        text,
                        attempts: attempt,
                    });
                }
                Err(error) if outcome == AttemptOutcome::Fatal => {
                    tracing::error!(
                        call_path = call_path.as_str(),
                        attempt,
                        error = %error,
                        "Provider call failed with non-retryable error"
                    );
                    return Err(RetryError::Fatal { attempt, error });
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            call_path = call_path.as_str(),
                            attempts = attempt,
                            error = %error,
                            "Provider still failing after all attempts"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let delay = self.policy.delay_before_retry(attempt);
                    tracing::warn!(
                        call_path = call_path.as_str(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(500));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(60_000));
        assert_eq!(
            policy.delay_before_retry(10),
            Duration::from_millis(MAX_BACKOFF_MS)
        );
        assert_eq!(
            policy.delay_before_retry(u32::MAX),
            Duration::from_millis(MAX_BACKOFF_MS)
        );
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_millis(1)).max_attempts(), 1);
    }

    #[test]
    fn test_default_policy_matches_default_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(500));
    }

    #[test]
    fn test_exhausted_maps_to_service_busy() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last_error: ProviderError::Status {
                endpoint: "test".to_string(),
                status: 429,
                message: "rate limited".to_string(),
            },
        };
        match AppError::from(err) {
            AppError::ServiceBusy {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("rate limited"));
            }
            other => panic!("expected ServiceBusy, got {:?}", other),
        }
    }

    #[test]
    fn test_fatal_maps_to_provider_error() {
        let err = RetryError::Fatal {
            attempt: 1,
            error: ProviderError::EmptyCompletion {
                endpoint: "test".to_string(),
            },
        };
        assert!(matches!(AppError::from(err), AppError::Provider(_)));
    }
}
