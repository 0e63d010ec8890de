//! HTTP request handlers for the StudyBuddy API

use crate::config::{Config, CorsConfig};
use crate::error::{AppError, AppResult};
use crate::metrics::{Endpoint, Metrics};
use crate::middleware::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
use crate::provider::{CompletionClient, RetryPolicy, RetryingClient, build_client};
use crate::service::StudyService;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod chat;
pub mod explain;
pub mod extractor;
pub mod fields;
pub mod flashcards;
pub mod health;
pub mod metrics;
pub mod quiz;
pub mod schedule;
pub mod study_plan;
pub mod subjects;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    service: Arc<StudyService>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Build state with the completion client selected by `provider.call_path`
    pub fn new(config: Config) -> AppResult<Self> {
        let client = build_client(&config.provider)?;
        Self::with_client(config, client)
    }

    /// Build state around an existing completion client
    pub fn with_client(config: Config, client: Arc<dyn CompletionClient>) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            AppError::Internal(format!("Failed to initialize metrics: {}", e))
        })?);
        let policy = RetryPolicy::from_config(&config.retry);
        let retrying = RetryingClient::new(client, policy, metrics.clone());

        Ok(Self {
            config: Arc::new(config),
            service: Arc::new(StudyService::new(retrying, metrics.clone())),
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &StudyService {
        &self.service
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Assemble the full API router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/api/subjects", get(subjects::handler))
        .route("/api/chat", post(chat::handler))
        .route("/api/quiz", post(quiz::handler))
        .route("/api/quiz/generate", post(quiz::handler))
        .route("/api/flashcards", post(flashcards::handler))
        .route("/api/explain", post(explain::handler))
        .route("/api/schedule", post(schedule::handler))
        .route("/api/study-plan", post(study_plan::handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// CORS policy from configured origins
///
/// `*` allows any origin without credentials. An explicit list allows
/// credentials; entries that are not valid header values are skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allows_any() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

/// Log a failed study request before it becomes a response
pub(crate) fn log_failure(request_id: RequestId, endpoint: Endpoint, error: AppError) -> AppError {
    match &error {
        AppError::ServiceBusy { attempts, last_error } => tracing::warn!(
            request_id = %request_id,
            endpoint = endpoint.as_str(),
            attempts,
            last_error = %last_error,
            "Provider stayed busy through every retry"
        ),
        other => tracing::error!(
            request_id = %request_id,
            endpoint = endpoint.as_str(),
            status = other.status().as_u16(),
            error = %other,
            "Study request failed"
        ),
    }
    error
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::CallPath;
    use crate::provider::{CompletionRequest, ProviderError};
    use async_trait::async_trait;

    /// Client that answers every request with the same text
    pub(crate) struct Canned(pub String);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
            Ok(self.0.clone())
        }

        fn call_path(&self) -> CallPath {
            CallPath::Direct
        }
    }

    pub(crate) fn state_replying(reply: &str) -> AppState {
        AppState::with_client(Config::default(), Arc::new(Canned(reply.to_string()))).unwrap()
    }
}
