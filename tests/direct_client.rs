//! Direct call path against a mock OpenAI-compatible provider
//!
//! Verifies the wire format (URL, auth, body), error extraction, and how
//! provider failures are classified for the retry wrapper.

mod common;

use common::fast_retry_config;
use serde_json::json;
use std::sync::Arc;
use studybuddy::config::Config;
use studybuddy::error::AppError;
use studybuddy::metrics::Metrics;
use studybuddy::provider::{
    CompletionClient, CompletionRequest, DirectClient, ProviderError, RetryError, RetryPolicy,
    RetryingClient,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, api_key: Option<&str>) -> Config {
    let mut toml = format!(
        "[provider]\nbase_url = \"{}/api/v1\"\nmodel = \"test/model\"\ntimeout_seconds = 1\n",
        server.uri()
    );
    if let Some(key) = api_key {
        toml.push_str(&format!("api_key = \"{}\"\n", key));
    }
    toml::from_str(&toml).expect("should parse test config")
}

fn client_for(server: &MockServer, api_key: Option<&str>) -> DirectClient {
    DirectClient::new(&config_for(server, api_key).provider).expect("client should build")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You are a tutor.", "Explain entropy")
        .with_temperature(0.5)
        .with_max_tokens(300)
}

fn retrying(client: DirectClient) -> RetryingClient {
    let config = fast_retry_config();
    RetryingClient::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
        Arc::new(Metrics::new().expect("should create Metrics")),
    )
}

#[tokio::test]
async fn test_success_sends_openai_shaped_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "StudyBuddy AI"))
        .and(body_partial_json(json!({
            "model": "test/model",
            "max_tokens": 300,
            "messages": [
                { "role": "system", "content": "You are a tutor." },
                { "role": "user", "content": "Explain entropy" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Entropy is disorder.")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server, Some("sk-test"))
        .complete(&request())
        .await
        .expect("completion should succeed");

    assert_eq!(text, "Entropy is disorder.");
}

#[tokio::test]
async fn test_missing_key_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    client_for(&server, None)
        .complete(&request())
        .await
        .expect("completion should succeed");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "No auth credentials found", "code": 401 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying(client_for(&server, Some("bad")))
        .complete(&request())
        .await
        .expect_err("401 should fail");

    match &err {
        RetryError::Fatal { attempt, error } => {
            assert_eq!(*attempt, 1);
            assert!(matches!(error, ProviderError::Status { status: 401, .. }));
            assert!(error.to_string().contains("No auth credentials found"));
        }
        other => panic!("expected fatal error, got {:?}", other),
    }
    assert!(matches!(AppError::from(err), AppError::Provider(_)));
}

#[tokio::test]
async fn test_rate_limit_then_success_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("second time lucky")))
        .expect(1)
        .mount(&server)
        .await;

    let completion = retrying(client_for(&server, Some("sk-test")))
        .complete(&request())
        .await
        .expect("retry should recover");

    assert_eq!(completion.text, "second time lucky");
    assert_eq!(completion.attempts, 2);
}

#[tokio::test]
async fn test_server_errors_exhaust_into_service_busy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let err = retrying(client_for(&server, None))
        .complete(&request())
        .await
        .expect_err("503 every time should fail");

    match AppError::from(err) {
        AppError::ServiceBusy { attempts, last_error } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("upstream unavailable"));
        }
        other => panic!("expected ServiceBusy, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_object_in_success_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "Provider returned error", "code": 429 }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .complete(&request())
        .await
        .expect_err("error object should fail");

    assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_empty_content_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .complete(&request())
        .await
        .expect_err("null content should fail");

    assert!(matches!(err, ProviderError::EmptyCompletion { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_garbage_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .complete(&request())
        .await
        .expect_err("html should fail");

    assert!(matches!(err, ProviderError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_slow_provider_times_out_as_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, None)
        .complete(&request())
        .await
        .expect_err("should time out");

    assert!(matches!(err, ProviderError::Timeout { timeout_seconds: 1, .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_provider_is_connection_error() {
    let server = MockServer::start().await;
    let config = config_for(&server, None);
    drop(server);

    let err = DirectClient::new(&config.provider)
        .unwrap()
        .complete(&request())
        .await
        .expect_err("closed port should fail");

    assert!(matches!(err, ProviderError::Connection { .. }));
    assert!(err.is_transient());
}
