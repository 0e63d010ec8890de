//! Weekly study plan endpoint

use crate::error::AppError;
use crate::generation::{StudyPlanContext, WeekPlan};
use crate::handlers::extractor::ApiJson;
use crate::handlers::fields::{MAX_TEXT_CHARS, in_range, required_text};
use crate::handlers::{AppState, log_failure};
use crate::metrics::Endpoint;
use crate::middleware::RequestId;
use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;

pub const WEEKS_RANGE: RangeInclusive<u32> = 1..=52;
pub const HOURS_PER_WEEK_RANGE: RangeInclusive<u32> = 1..=112;

#[derive(Debug, Clone)]
pub struct StudyPlanRequest {
    context: StudyPlanContext,
}

impl StudyPlanRequest {
    pub fn context(&self) -> &StudyPlanContext {
        &self.context
    }
}

impl<'de> Deserialize<'de> for StudyPlanRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawStudyPlanRequest {
            subject: String,
            goal: String,
            available_hours_per_week: u32,
            duration_weeks: u32,
        }

        let raw = RawStudyPlanRequest::deserialize(deserializer)?;

        let subject =
            required_text("subject", &raw.subject, MAX_TEXT_CHARS).map_err(D::Error::custom)?;
        let goal = required_text("goal", &raw.goal, MAX_TEXT_CHARS).map_err(D::Error::custom)?;
        let hours_per_week = in_range(
            "available_hours_per_week",
            raw.available_hours_per_week,
            HOURS_PER_WEEK_RANGE,
        )
        .map_err(D::Error::custom)?;
        let weeks = in_range("duration_weeks", raw.duration_weeks, WEEKS_RANGE)
            .map_err(D::Error::custom)?;

        Ok(StudyPlanRequest {
            context: StudyPlanContext {
                subject,
                goal,
                weeks,
                hours_per_week,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub overview: String,
}

#[derive(Debug, Serialize)]
pub struct StudyPlanResponse {
    pub plan: PlanSummary,
    pub weekly_schedule: Vec<WeekPlan>,
    pub milestones: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/study-plan
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<StudyPlanRequest>,
) -> Result<Json<StudyPlanResponse>, AppError> {
    let ctx = request.context();
    tracing::debug!(
        request_id = %request_id,
        subject = %ctx.subject,
        weeks = ctx.weeks,
        hours_per_week = ctx.hours_per_week,
        "Received study plan request"
    );

    let plan = state
        .service()
        .study_plan(ctx)
        .await
        .map_err(|e| log_failure(request_id, Endpoint::StudyPlan, e))?;

    Ok(Json(StudyPlanResponse {
        plan: PlanSummary {
            overview: plan.overview,
        },
        weekly_schedule: plan.weekly_schedule,
        milestones: plan.milestones,
        generated_at: Utc::now(),
    }))
}
