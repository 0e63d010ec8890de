//! Retry wrapper timing and exhaustion
//!
//! Runs on paused tokio time, so backoff sleeps complete instantly while the
//! recorded call instants still show the exact delays.

mod common;

use common::{ScriptedClient, rate_limited, unauthorized};
use std::sync::Arc;
use std::time::Duration;
use studybuddy::config::RetryConfig;
use studybuddy::error::AppError;
use studybuddy::metrics::Metrics;
use studybuddy::provider::{CompletionRequest, ProviderError, RetryError, RetryPolicy, RetryingClient};

fn retrying(client: Arc<ScriptedClient>, policy: RetryPolicy) -> (RetryingClient, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().expect("should create Metrics"));
    (RetryingClient::new(client, policy, metrics.clone()), metrics)
}

fn request() -> CompletionRequest {
    CompletionRequest::new("system", "prompt")
}

fn gaps(client: &ScriptedClient) -> Vec<Duration> {
    client
        .call_instants()
        .windows(2)
        .map(|w| w[1].duration_since(w[0]))
        .collect()
}

fn assert_close(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(50),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[tokio::test(start_paused = true)]
async fn test_two_transient_failures_then_success_uses_doubling_backoff() {
    let client = ScriptedClient::new(vec![
        Err(rate_limited()),
        Err(ProviderError::Timeout {
            endpoint: "http://provider.test".to_string(),
            timeout_seconds: 60,
        }),
        Ok("finally".to_string()),
    ]);
    let policy = RetryPolicy::from_config(&RetryConfig::default());
    let (retrying, metrics) = retrying(client.clone(), policy);

    let completion = retrying.complete(&request()).await.expect("third attempt succeeds");

    assert_eq!(completion.text, "finally");
    assert_eq!(completion.attempts, 3);
    assert_eq!(client.call_count(), 3);

    let gaps = gaps(&client);
    assert_close(gaps[0], 500);
    assert_close(gaps[1], 1000);

    let text = metrics.gather().unwrap();
    assert!(text.contains(
        "studybuddy_provider_attempts_total{call_path=\"direct\",outcome=\"transient\"} 2"
    ));
    assert!(text.contains(
        "studybuddy_provider_attempts_total{call_path=\"direct\",outcome=\"success\"} 1"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_always_transient_exhausts_into_service_busy() {
    let client = ScriptedClient::failing(rate_limited());
    let policy = RetryPolicy::new(4, Duration::from_millis(100));
    let (retrying, _) = retrying(client.clone(), policy);

    let err = retrying.complete(&request()).await.expect_err("never succeeds");

    assert!(matches!(err, RetryError::Exhausted { attempts: 4, .. }));
    assert_eq!(client.call_count(), 4);
    let gaps = gaps(&client);
    assert_close(gaps[0], 100);
    assert_close(gaps[1], 200);
    assert_close(gaps[2], 400);

    let app_error = AppError::from(err);
    assert!(matches!(app_error, AppError::ServiceBusy { attempts: 4, .. }));
    assert_eq!(app_error.status().as_u16(), 503);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_is_surfaced_after_one_attempt() {
    let client = ScriptedClient::new(vec![Err(unauthorized()), Ok("never reached".to_string())]);
    let policy = RetryPolicy::from_config(&RetryConfig::default());
    let (retrying, metrics) = retrying(client.clone(), policy);

    let err = retrying.complete(&request()).await.expect_err("401 is fatal");

    assert!(matches!(err, RetryError::Fatal { attempt: 1, .. }));
    assert_eq!(client.call_count(), 1);

    let app_error = AppError::from(err);
    assert_eq!(app_error.status().as_u16(), 500);
    assert!(app_error.to_string().contains("Invalid API key"));
    assert!(
        metrics
            .gather()
            .unwrap()
            .contains("studybuddy_provider_attempts_total{call_path=\"direct\",outcome=\"fatal\"} 1")
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let client = ScriptedClient::failing(rate_limited());
    let policy = RetryPolicy::new(1, Duration::from_millis(500));
    let (retrying, _) = retrying(client.clone(), policy);

    let started = tokio::time::Instant::now();
    let err = retrying.complete(&request()).await.expect_err("one transient failure");

    assert!(matches!(err, RetryError::Exhausted { attempts: 1, .. }));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[test]
fn test_backoff_is_capped() {
    let policy = RetryPolicy::new(10, Duration::from_millis(20_000));
    assert_eq!(policy.delay_before_retry(1), Duration::from_millis(20_000));
    assert_eq!(policy.delay_before_retry(2), Duration::from_millis(30_000));
    assert_eq!(policy.delay_before_retry(9), Duration::from_millis(30_000));
}
