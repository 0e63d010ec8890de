//! Topic explanation endpoint

use crate::error::AppError;
use crate::generation::{Difficulty, Explanation};
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{MAX_TEXT_CHARS, required_text};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `depth` takes the difficulty values, plus `basic`
#[derive(Debug, Clone)]
pub struct ExplainRequest {
    topic: String,
    depth: Difficulty,
}

impl ExplainRequest {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn depth(&self) -> Difficulty {
        self.depth
    }
}

impl<'de> Deserialize<'de> for ExplainRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawExplainRequest {
            topic: String,
            #[serde(default)]
            depth: Option<Difficulty>,
        }

        let raw = RawExplainRequest::deserialize(deserializer)?;
        let topic =
            required_text("topic", &raw.topic, MAX_TEXT_CHARS).map_err(D::Error::custom)?;

        Ok(ExplainRequest {
            topic,
            depth: raw.depth.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub topic: String,
    #[serde(flatten)]
    pub explanation: Explanation,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/explain
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<ExplainRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    tracing::debug!(
        request_id = %request_id,
        topic = request.topic(),
        depth = request.depth().as_str(),
        "Received explain request"
    );

    let explanation = state
        .service()
        .explain(request.topic(), request.depth())
        .await
        .map_err(|e| log_failure(request_id, Endpoint::Explain, e))?;

    Ok(Json(ExplainResponse {
        topic: request.topic,
        explanation,
        generated_at: Utc::now(),
    }))
}
