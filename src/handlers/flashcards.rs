//! Flashcard generation endpoint

use crate::error::AppError;
use crate::generation::Flashcard;
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{COUNT_RANGE, DEFAULT_COUNT, MAX_TEXT_CHARS, in_range, required_text};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone)]
pub struct FlashcardRequest {
    topic: String,
    count: u32,
}

impl FlashcardRequest {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl<'de> Deserialize<'de> for FlashcardRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawFlashcardRequest {
            topic: String,
            #[serde(default)]
            count: Option<u32>,
        }

        let raw = RawFlashcardRequest::deserialize(deserializer)?;

        let topic =
            required_text("topic", &raw.topic, MAX_TEXT_CHARS).map_err(D::Error::custom)?;
        let count = in_range("count", raw.count.unwrap_or(DEFAULT_COUNT), COUNT_RANGE)
            .map_err(D::Error::custom)?;

        Ok(FlashcardRequest { topic, count })
    }
}

#[derive(Debug, Serialize)]
pub struct FlashcardResponse {
    pub topic: String,
    pub flashcards: Vec<Flashcard>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/flashcards
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<FlashcardRequest>,
) -> Result<Json<FlashcardResponse>, AppError> {
    tracing::debug!(
        request_id = %request_id,
        topic = request.topic(),
        count = request.count(),
        "Received flashcard request"
    );

    let repaired = state
        .service()
        .flashcards(request.topic(), request.count() as usize)
        .await
        .map_err(|e| log_failure(request_id, Endpoint::Flashcards, e))?;

    Ok(Json(FlashcardResponse {
        topic: request.topic,
        flashcards: repaired.items,
        generated_at: Utc::now(),
    }))
}
