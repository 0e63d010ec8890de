//! Agent-framework client
//!
//! Sends the prompt through `open_agent::query` and concatenates the text
//! blocks of the resulting stream. The whole stream is bounded by the
//! per-attempt timeout.

use super::{CompletionClient, CompletionRequest, ProviderError};
use crate::config::{CallPath, ProviderConfig};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

/// Key sent when none is configured; local OpenAI-compatible servers ignore it
const NO_API_KEY: &str = "not-needed";

/// Status code of an SDK API error, formatted as `API error 401 Unauthorized: body`
fn api_error_status(message: &str) -> Option<u16> {
    let rest = message.trim_start().strip_prefix("API error ")?;
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..digits].parse().ok()
}

/// Client for the agent call path
pub struct AgentClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_seconds: u64,
}

impl AgentClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            api_key: config.api_key().map(str::to_string),
            timeout_seconds: config.timeout_seconds(),
        }
    }

    /// Classify an SDK error so the shared status table decides retries
    ///
    /// `bytes_received` is the partial response length when the error came
    /// from the stream rather than the initial request.
    fn classify(&self, error: open_agent::Error, bytes_received: usize) -> ProviderError {
        let endpoint = self.base_url.clone();
        match error {
            open_agent::Error::Http(e) => {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        endpoint,
                        timeout_seconds: self.timeout_seconds,
                    }
                } else if let Some(status) = e.status() {
                    ProviderError::Status {
                        endpoint,
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else if e.is_decode() {
                    ProviderError::InvalidResponse {
                        endpoint,
                        reason: e.to_string(),
                    }
                } else {
                    ProviderError::Connection {
                        endpoint,
                        reason: e.to_string(),
                    }
                }
            }
            open_agent::Error::Api(message) => match api_error_status(&message) {
                Some(status) => ProviderError::Status {
                    endpoint,
                    status,
                    message,
                },
                None => ProviderError::InvalidResponse {
                    endpoint,
                    reason: message,
                },
            },
            open_agent::Error::Stream(reason) => ProviderError::StreamInterrupted {
                endpoint,
                bytes_received,
                reason,
            },
            open_agent::Error::Json(e) => ProviderError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            },
            open_agent::Error::Tool(reason) | open_agent::Error::Other(reason) => {
                ProviderError::InvalidResponse { endpoint, reason }
            }
            open_agent::Error::Config(reason) | open_agent::Error::InvalidInput(reason) => {
                ProviderError::ClientConfig(reason)
            }
            open_agent::Error::Timeout => ProviderError::Timeout {
                endpoint,
                timeout_seconds: self.timeout_seconds,
            },
        }
    }

    async fn collect(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let options = open_agent::AgentOptions::builder()
            .system_prompt(request.system.as_str())
            .model(self.model.as_str())
            .base_url(self.base_url.as_str())
            .api_key(self.api_key.as_deref().unwrap_or(NO_API_KEY))
            .max_tokens(request.max_tokens)
            .temperature(request.temperature)
            .build()
            .map_err(|e| {
                tracing::error!(
                    base_url = %self.base_url,
                    model = %self.model,
                    error = %e,
                    "Failed to build AgentOptions"
                );
                ProviderError::ClientConfig(format!("agent options: {}", e))
            })?;

        let mut stream = open_agent::query(&request.prompt, &options)
            .await
            .map_err(|e| self.classify(e, 0))?;

        let mut text = String::new();
        let mut block_count = 0usize;
        while let Some(result) = stream.next().await {
            match result {
                Ok(open_agent::ContentBlock::Text(block)) => {
                    block_count += 1;
                    text.push_str(&block.text);
                }
                Ok(other) => {
                    block_count += 1;
                    tracing::debug!(
                        block_type = ?other,
                        block_number = block_count,
                        "Skipping non-text content block"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        base_url = %self.base_url,
                        error = %e,
                        block_count,
                        partial_response_length = text.len(),
                        "Agent stream failed, discarding partial response"
                    );
                    return Err(self.classify(e, text.len()));
                }
            }
        }

        Ok(text)
    }
}

#[async_trait]
impl CompletionClient for AgentClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        tracing::debug!(
            base_url = %self.base_url,
            model = %self.model,
            prompt_length = request.prompt.len(),
            timeout_seconds = self.timeout_seconds,
            "Starting agent query"
        );

        let text = tokio::time::timeout(
            Duration::from_secs(self.timeout_seconds),
            self.collect(request),
        )
        .await
        .map_err(|_elapsed| ProviderError::Timeout {
            endpoint: self.base_url.clone(),
            timeout_seconds: self.timeout_seconds,
        })??;

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion {
                endpoint: self.base_url.clone(),
            });
        }

        Ok(text)
    }

    fn call_path(&self) -> CallPath {
        CallPath::Agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ProviderConfig {
        let config: crate::config::Config = toml::from_str(&format!(
            "[provider]\ncall_path = \"agent\"\nbase_url = \"{}\"\ntimeout_seconds = 2\n",
            base_url
        ))
        .expect("should parse test config");
        config.provider
    }

    #[test]
    fn test_agent_client_reports_agent_call_path() {
        let client = AgentClient::new(&config("http://localhost:1234/v1"));
        assert_eq!(client.call_path(), CallPath::Agent);
        assert_eq!(client.base_url, "http://localhost:1234/v1");
        assert_eq!(client.timeout_seconds, 2);
    }

    #[test]
    fn test_api_error_status_parsing() {
        assert_eq!(
            api_error_status("API error 401 Unauthorized: {\"error\":{}}"),
            Some(401)
        );
        assert_eq!(api_error_status("API error 503 Service Unavailable: "), Some(503));
        assert_eq!(api_error_status("Model 'x' not found"), None);
        assert_eq!(api_error_status("API error : empty"), None);
    }

    #[test]
    fn test_sdk_errors_are_classified_by_variant() {
        let client = AgentClient::new(&config("http://localhost:1234/v1"));

        let unauthorized = client.classify(
            open_agent::Error::Api("API error 401 Unauthorized: bad key".to_string()),
            0,
        );
        assert!(matches!(unauthorized, ProviderError::Status { status: 401, .. }));
        assert!(!unauthorized.is_transient());

        let limited = client.classify(
            open_agent::Error::Api("API error 429 Too Many Requests: slow down".to_string()),
            0,
        );
        assert!(limited.is_transient());

        let config_error = client.classify(open_agent::Error::Config("no model".to_string()), 0);
        assert!(matches!(config_error, ProviderError::ClientConfig(_)));
        assert!(!config_error.is_transient());

        let input = client.classify(open_agent::Error::InvalidInput("empty".to_string()), 0);
        assert!(!input.is_transient());

        let json = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let decode = client.classify(open_agent::Error::Json(json), 0);
        assert!(matches!(decode, ProviderError::InvalidResponse { .. }));

        let timeout = client.classify(open_agent::Error::Timeout, 0);
        assert!(matches!(
            timeout,
            ProviderError::Timeout {
                timeout_seconds: 2,
                ..
            }
        ));

        let stream = client.classify(open_agent::Error::Stream("reset".to_string()), 42);
        assert!(matches!(
            stream,
            ProviderError::StreamInterrupted {
                bytes_received: 42,
                ..
            }
        ));
        assert!(stream.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        // Port 9 (discard) is closed on test machines.
        let client = AgentClient::new(&config("http://127.0.0.1:9/v1"));
        let err = client
            .complete(&CompletionRequest::new("system", "hello"))
            .await
            .expect_err("nothing is listening");
        assert!(err.is_transient(), "expected transient error, got {:?}", err);
    }
}
