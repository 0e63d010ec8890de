//! Shared test fixtures: a scripted completion client and app builders

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use studybuddy::config::{CallPath, Config, RetryConfig};
use studybuddy::handlers::{self, AppState};
use studybuddy::provider::{CompletionClient, CompletionRequest, ProviderError};
use tokio::time::Instant;
use tower::ServiceExt;

/// Completion client that plays back a fixed script
///
/// Each call pops the next scripted result; the last one repeats once the
/// script runs out. Every call is recorded with the (tokio) instant it
/// started, so paused-time tests can measure backoff gaps.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<(Instant, CompletionRequest)>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        assert!(!script.is_empty(), "script needs at least one response");
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, req)| req.clone())
            .collect()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));

        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }

    fn call_path(&self) -> CallPath {
        CallPath::Direct
    }
}

pub fn rate_limited() -> ProviderError {
    ProviderError::Status {
        endpoint: "http://provider.test/chat/completions".to_string(),
        status: 429,
        message: "Rate limit exceeded".to_string(),
    }
}

pub fn unauthorized() -> ProviderError {
    ProviderError::Status {
        endpoint: "http://provider.test/chat/completions".to_string(),
        status: 401,
        message: "Invalid API key".to_string(),
    }
}

/// Default config with a 1 ms backoff so retry paths stay fast
pub fn fast_retry_config() -> Config {
    Config {
        retry: RetryConfig::new(3, 1).unwrap(),
        ..Config::default()
    }
}

pub fn app_with(client: Arc<ScriptedClient>) -> (Router, AppState) {
    let state = AppState::with_client(fast_retry_config(), client).unwrap();
    (handlers::router(state.clone()), state)
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
