//! Agent call path against a mock OpenAI-compatible provider
//!
//! HTTP failures surfaced by open-agent-sdk must land in the same typed
//! `ProviderError` variants as the direct path, so the retry wrapper treats
//! a bad key as fatal and a rate limit as transient.

mod common;

use common::fast_retry_config;
use serde_json::json;
use std::sync::Arc;
use studybuddy::config::Config;
use studybuddy::error::AppError;
use studybuddy::metrics::Metrics;
use studybuddy::provider::{
    AgentClient, CompletionClient, CompletionRequest, ProviderError, RetryError, RetryPolicy,
    RetryingClient,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> AgentClient {
    let config: Config = toml::from_str(&format!(
        "[provider]\ncall_path = \"agent\"\nbase_url = \"{}/api/v1\"\n\
         model = \"test/model\"\napi_key = \"sk-test\"\ntimeout_seconds = 2\n",
        server.uri()
    ))
    .expect("should parse test config");
    AgentClient::new(&config.provider)
}

fn retrying(client: AgentClient) -> RetryingClient {
    let config = fast_retry_config();
    RetryingClient::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
        Arc::new(Metrics::new().expect("should create Metrics")),
    )
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You are a tutor.", "Explain entropy")
}

fn sse_chunk(content: &str) -> String {
    let chunk = json!({
        "id": "gen-1",
        "object": "chat.completion.chunk",
        "created": 1,
        "model": "test/model",
        "choices": [{ "index": 0, "delta": { "content": content }, "finish_reason": null }]
    });
    format!("data: {}\n\n", chunk)
}

#[tokio::test]
async fn test_streamed_text_blocks_are_concatenated() {
    let server = MockServer::start().await;
    let body = format!(
        "{}{}data: [DONE]\n\n",
        sse_chunk("Entropy is "),
        sse_chunk("disorder.")
    );
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server)
        .complete(&request())
        .await
        .expect("stream should complete");
    assert_eq!(text, "Entropy is disorder.");
}

#[tokio::test]
async fn test_unauthorized_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "No auth credentials found", "code": 401 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = retrying(client_for(&server))
        .complete(&request())
        .await
        .expect_err("401 should fail");

    match &err {
        RetryError::Fatal { attempt, error } => {
            assert_eq!(*attempt, 1);
            assert!(
                matches!(error, ProviderError::Status { status: 401, .. }),
                "expected Status 401, got {:?}",
                error
            );
            assert!(!error.is_transient());
            assert!(error.to_string().contains("No auth credentials found"));
        }
        other => panic!("expected fatal error, got {:?}", other),
    }
    assert!(matches!(AppError::from(err), AppError::Provider(_)));
}

#[tokio::test]
async fn test_bad_request_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unknown model"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&request())
        .await
        .expect_err("400 should fail");
    assert!(matches!(err, ProviderError::Status { status: 400, .. }));
    assert!(!err.is_transient());
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
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(format!("{}data: [DONE]\n\n", sse_chunk("second time lucky"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let completion = retrying(client_for(&server))
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

    let err = retrying(client_for(&server))
        .complete(&request())
        .await
        .expect_err("503 every time should fail");

    match AppError::from(err) {
        AppError::ServiceBusy {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"));
        }
        other => panic!("expected ServiceBusy, got {:?}", other),
    }
}
