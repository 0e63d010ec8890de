//! Tutor chat endpoint

use crate::error::AppError;
use crate::generation::Difficulty;
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{MAX_MESSAGE_CHARS, MAX_TEXT_CHARS, optional_text, required_text};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use crate::service::FOLLOW_UP_QUESTIONS;
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Deserializer, Serialize};

/// Chat request from client
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    message: String,
    subject: Option<String>,
    difficulty: Difficulty,
}

impl ChatRequest {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatRequest {
            message: String,
            #[serde(default)]
            subject: Option<String>,
            #[serde(default)]
            difficulty: Option<Difficulty>,
        }

        use serde::de::Error;

        let raw = RawChatRequest::deserialize(deserializer)?;

        let message = required_text("message", &raw.message, MAX_MESSAGE_CHARS)
            .map_err(D::Error::custom)?;
        let subject = optional_text("subject", raw.subject, MAX_TEXT_CHARS)
            .map_err(D::Error::custom)?;

        Ok(ChatRequest {
            message,
            subject,
            difficulty: raw.difficulty.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    /// Always null; the tutor does not cite sources
    pub sources: Option<Vec<String>>,
    pub follow_up_questions: Vec<String>,
}

/// POST /api/chat
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    tracing::debug!(
        request_id = %request_id,
        message_length = request.message().len(),
        subject = ?request.subject(),
        difficulty = request.difficulty().as_str(),
        "Received chat request"
    );

    let response = state
        .service()
        .chat(request.message(), request.subject(), request.difficulty())
        .await
        .map_err(|e| log_failure(request_id, Endpoint::Chat, e))?;

    Ok(Json(ChatResponse {
        response,
        sources: None,
        follow_up_questions: FOLLOW_UP_QUESTIONS.iter().map(|q| q.to_string()).collect(),
    }))
}
