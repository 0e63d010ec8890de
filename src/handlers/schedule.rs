//! Multi-day study schedule endpoint

use crate::error::AppError;
use crate::generation::{ScheduleContext, StudyBlock};
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{MAX_TEXT_CHARS, in_range, required_text};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;

pub const MAX_TOPICS: usize = 10;
pub const DAYS_RANGE: RangeInclusive<u32> = 1..=30;
pub const HOURS_PER_DAY_RANGE: RangeInclusive<u32> = 1..=16;

#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    context: ScheduleContext,
}

impl ScheduleRequest {
    pub fn context(&self) -> &ScheduleContext {
        &self.context
    }
}

impl<'de> Deserialize<'de> for ScheduleRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawScheduleRequest {
            topics: Vec<String>,
            #[serde(default)]
            hours_per_day: Option<u32>,
            #[serde(default)]
            days: Option<u32>,
        }

        let raw = RawScheduleRequest::deserialize(deserializer)?;

        if raw.topics.is_empty() || raw.topics.len() > MAX_TOPICS {
            return Err(D::Error::custom(format!(
                "topics must contain between 1 and {} entries (got {})",
                MAX_TOPICS,
                raw.topics.len()
            )));
        }
        let topics = raw
            .topics
            .iter()
            .map(|topic| required_text("topics", topic, MAX_TEXT_CHARS))
            .collect::<Result<Vec<_>, _>>()
            .map_err(D::Error::custom)?;

        let hours_per_day = in_range(
            "hours_per_day",
            raw.hours_per_day.unwrap_or(2),
            HOURS_PER_DAY_RANGE,
        )
        .map_err(D::Error::custom)?;
        let days = in_range("days", raw.days.unwrap_or(7), DAYS_RANGE).map_err(D::Error::custom)?;

        Ok(ScheduleRequest {
            context: ScheduleContext {
                topics,
                days,
                hours_per_day,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule: Vec<StudyBlock>,
    pub total_hours: u32,
    pub tips: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/schedule
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let ctx = request.context();
    tracing::debug!(
        request_id = %request_id,
        topics = ctx.topics.len(),
        days = ctx.days,
        hours_per_day = ctx.hours_per_day,
        "Received schedule request"
    );

    let schedule = state
        .service()
        .schedule(ctx)
        .await
        .map_err(|e| log_failure(request_id, Endpoint::Schedule, e))?;

    Ok(Json(ScheduleResponse {
        schedule: schedule.blocks,
        total_hours: schedule.total_hours,
        tips: schedule.tips,
        generated_at: Utc::now(),
    }))
}
