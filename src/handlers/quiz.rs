//! Quiz generation endpoint (`/api/quiz` and `/api/quiz/generate`)

use crate::error::AppError;
use crate::generation::{Difficulty, QuizItem};
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{
    COUNT_RANGE, DEFAULT_COUNT, MAX_TEXT_CHARS, in_range, optional_text, required_text,
};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone)]
pub struct QuizRequest {
    topic: String,
    subject: Option<String>,
    difficulty: Difficulty,
    count: u32,
}

impl QuizRequest {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl<'de> Deserialize<'de> for QuizRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawQuizRequest {
            topic: String,
            #[serde(default)]
            subject: Option<String>,
            #[serde(default)]
            difficulty: Option<Difficulty>,
            #[serde(default = "default_count", alias = "num_questions")]
            count: u32,
        }

        fn default_count() -> u32 {
            DEFAULT_COUNT
        }

        use serde::de::Error;

        let raw = RawQuizRequest::deserialize(deserializer)?;

        let topic =
            required_text("topic", &raw.topic, MAX_TEXT_CHARS).map_err(D::Error::custom)?;
        let subject =
            optional_text("subject", raw.subject, MAX_TEXT_CHARS).map_err(D::Error::custom)?;
        let count = in_range("count", raw.count, COUNT_RANGE).map_err(D::Error::custom)?;

        Ok(QuizRequest {
            topic,
            subject,
            difficulty: raw.difficulty.unwrap_or_default(),
            count,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub difficulty: Difficulty,
    pub questions: Vec<QuizItem>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/quiz
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<QuizRequest>,
) -> Result<Json<QuizResponse>, AppError> {
    tracing::debug!(
        request_id = %request_id,
        topic = request.topic(),
        difficulty = request.difficulty().as_str(),
        count = request.count(),
        "Received quiz request"
    );

    let repaired = state
        .service()
        .quiz(
            request.topic(),
            request.subject(),
            request.difficulty(),
            request.count() as usize,
        )
        .await
        .map_err(|e| log_failure(request_id, Endpoint::Quiz, e))?;

    tracing::info!(
        request_id = %request_id,
        outcome = repaired.outcome.as_str(),
        questions = repaired.items.len(),
        filler = repaired.filler,
        "Quiz generated"
    );

    Ok(Json(QuizResponse {
        topic: request.topic,
        subject: request.subject,
        difficulty: request.difficulty,
        questions: repaired.items,
        generated_at: Utc::now(),
    }))
}
