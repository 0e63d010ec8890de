//! Direct chat-completions client
//!
//! Posts an OpenAI-shaped request to `{base_url}/chat/completions` with bearer
//! auth and reads `choices[0].message.content` from the reply.

use super::{CompletionClient, CompletionRequest, ProviderError};
use crate::config::{CallPath, ProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Title header OpenRouter shows in its dashboard
const APP_TITLE: &str = "StudyBuddy AI";

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ErrorObject {
    /// Numeric HTTP-like code carried in the error object, if any
    fn status_code(&self) -> Option<u16> {
        match &self.code {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .filter(|c| (100..=599).contains(c))
    }
}

/// Client for the direct call path
pub struct DirectClient {
    http: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout_seconds: u64,
}

impl DirectClient {
    /// Build a client from provider configuration
    ///
    /// The per-attempt timeout is enforced by reqwest.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()
            .map_err(|e| ProviderError::ClientConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.chat_completions_url(),
            model: config.model().to_string(),
            api_key: config.api_key().map(str::to_string),
            timeout_seconds: config.timeout_seconds(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                endpoint: self.url.clone(),
                timeout_seconds: self.timeout_seconds,
            }
        } else if err.is_decode() || err.is_body() {
            ProviderError::StreamInterrupted {
                endpoint: self.url.clone(),
                bytes_received: 0,
                reason: err.to_string(),
            }
        } else {
            ProviderError::Connection {
                endpoint: self.url.clone(),
                reason: err.to_string(),
            }
        }
    }

    /// Map a non-success reply to a typed status error
    ///
    /// Uses `error.message` from the body when present, the raw body otherwise.
    fn status_error(&self, status: u16, body: &str) -> ProviderError {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "empty error body".to_string()
                } else {
                    trimmed.chars().take(500).collect()
                }
            });

        ProviderError::Status {
            endpoint: self.url.clone(),
            status,
            message,
        }
    }

    fn parse_reply(&self, body: &str) -> Result<String, ProviderError> {
        let reply: ChatCompletionReply =
            serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse {
                endpoint: self.url.clone(),
                reason: e.to_string(),
            })?;

        // OpenRouter reports some upstream failures inside a 200 reply.
        if reply.choices.is_empty() {
            if let Some(error) = reply.error {
                return Err(ProviderError::Status {
                    endpoint: self.url.clone(),
                    status: error.status_code().unwrap_or(502),
                    message: error
                        .message
                        .unwrap_or_else(|| "provider returned an error object".to_string()),
                });
            }
        }

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion {
                endpoint: self.url.clone(),
            });
        }

        Ok(content)
    }
}

#[async_trait]
impl CompletionClient for DirectClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            url = %self.url,
            model = %self.model,
            prompt_length = request.prompt.len(),
            max_tokens = request.max_tokens,
            "Sending chat completion request"
        );

        let mut builder = self
            .http
            .post(&self.url)
            .header("X-Title", APP_TITLE)
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            tracing::warn!(
                url = %self.url,
                status = status.as_u16(),
                "Provider returned non-success status"
            );
            return Err(self.status_error(status.as_u16(), &text));
        }

        let content = self.parse_reply(&text)?;
        tracing::debug!(
            url = %self.url,
            response_length = content.len(),
            "Chat completion received"
        );
        Ok(content)
    }

    fn call_path(&self) -> CallPath {
        CallPath::Direct
    }
}
