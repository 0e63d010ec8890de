//! Remote completion clients
//!
//! A [`CompletionClient`] sends one prompt to the provider and returns the raw
//! completion text. Two implementations exist and are selected by
//! `provider.call_path`:
//!
//! - [`DirectClient`]: plain chat-completions request over reqwest
//! - [`AgentClient`]: streaming query through open-agent-sdk
//!
//! Clients never retry. Retrying is the job of [`RetryingClient`], which relies
//! on [`ProviderError::is_transient`] to decide.

use crate::config::{CallPath, ProviderConfig};
use async_trait::async_trait;
use std::sync::Arc;

pub mod agent;
pub mod direct;
pub mod retry;

pub use agent::AgentClient;
pub use direct::DirectClient;
pub use retry::{AttemptOutcome, Completion, RetryError, RetryPolicy, RetryingClient};

/// One completion call: fixed system instruction plus a composed prompt
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Provider failures, classified by type so retry decisions never look at
/// message text
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Non-success HTTP status, or an error object in a success body
    #[error("Provider at {endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Request to {endpoint} timed out after {timeout_seconds} seconds")]
    Timeout {
        endpoint: String,
        timeout_seconds: u64,
    },

    #[error("Failed to reach provider at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Stream from {endpoint} interrupted after {bytes_received} bytes: {reason}")]
    StreamInterrupted {
        endpoint: String,
        bytes_received: usize,
        reason: String,
    },

    #[error("Provider at {endpoint} returned an undecodable response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Provider at {endpoint} returned an empty completion")]
    EmptyCompletion { endpoint: String },

    #[error("Failed to configure provider client: {0}")]
    ClientConfig(String),
}

impl ProviderError {
    /// Returns true if retrying the same call may succeed
    ///
    /// Transient: timeouts, connection failures, interrupted streams, and
    /// HTTP 408 / 409 / 425 / 429 / 500 / 502 / 503 / 504.
    /// Everything else (auth failures, bad requests, undecodable or empty
    /// completions, client configuration) is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => {
                matches!(status, 408 | 409 | 425 | 429 | 500 | 502 | 503 | 504)
            }
            ProviderError::Timeout { .. }
            | ProviderError::Connection { .. }
            | ProviderError::StreamInterrupted { .. } => true,
            ProviderError::InvalidResponse { .. }
            | ProviderError::EmptyCompletion { .. }
            | ProviderError::ClientConfig(_) => false,
        }
    }
}

/// Sends a single completion request to the provider
///
/// Implementations are built once at startup and shared through `AppState`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the completion text for `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    /// Call path label used in logs and metrics
    fn call_path(&self) -> CallPath;
}

/// Build the client selected by `provider.call_path`
pub fn build_client(config: &ProviderConfig) -> Result<Arc<dyn CompletionClient>, ProviderError> {
    if config.api_key().is_none() {
        tracing::warn!(
            base_url = %config.base_url(),
            "No provider API key configured (set OPENROUTER_API_KEY); \
             requests to hosted providers will be rejected"
        );
    }

    let client: Arc<dyn CompletionClient> = match config.call_path() {
        CallPath::Direct => Arc::new(DirectClient::new(config)?),
        CallPath::Agent => Arc::new(AgentClient::new(config)),
    };

    tracing::info!(
        call_path = config.call_path().as_str(),
        model = %config.model(),
        base_url = %config.base_url(),
        "Completion client ready"
    );

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ProviderError {
        ProviderError::Status {
            endpoint: "test".to_string(),
            status: code,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_rate_limit_and_conflict_are_transient() {
        for code in [408, 409, 425, 429, 500, 502, 503, 504] {
            assert!(status(code).is_transient(), "HTTP {} should be transient", code);
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for code in [400, 401, 402, 403, 404, 422, 501] {
            assert!(!status(code).is_transient(), "HTTP {} should be fatal", code);
        }
    }

    #[test]
    fn test_network_errors_are_transient() {
        let timeout = ProviderError::Timeout {
            endpoint: "test".to_string(),
            timeout_seconds: 30,
        };
        let connection = ProviderError::Connection {
            endpoint: "test".to_string(),
            reason: "connection refused".to_string(),
        };
        let stream = ProviderError::StreamInterrupted {
            endpoint: "test".to_string(),
            bytes_received: 12,
            reason: "reset".to_string(),
        };
        assert!(timeout.is_transient());
        assert!(connection.is_transient());
        assert!(stream.is_transient());
    }

    #[test]
    fn test_message_text_does_not_affect_classification() {
        // A fatal status stays fatal even if the body mentions a conflict.
        let err = ProviderError::Status {
            endpoint: "test".to_string(),
            status: 400,
            message: "OptimisticConcurrencyControlFailure".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_empty_completion_is_fatal() {
        let err = ProviderError::EmptyCompletion {
            endpoint: "test".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("system", "prompt")
            .with_temperature(0.8)
            .with_max_tokens(2000);
        assert_eq!(req.system, "system");
        assert_eq!(req.prompt, "prompt");
        assert_eq!(req.temperature, 0.8);
        assert_eq!(req.max_tokens, 2000);
    }

    #[test]
    fn test_build_client_follows_call_path() {
        let direct: ProviderConfig = toml::from_str("").expect("default provider config");
        let client = build_client(&direct).expect("direct client should build");
        assert_eq!(client.call_path(), CallPath::Direct);

        let agent: ProviderConfig =
            toml::from_str("call_path = \"agent\"").expect("agent provider config");
        let client = build_client(&agent).expect("agent client should build");
        assert_eq!(client.call_path(), CallPath::Agent);
    }
}
