//! Weekly study plans with milestones

use super::repair::{
    ItemRejection, RepairOutcome, loose_number, parse_payload, payload_items, string_list,
    strip_code_fences,
};
use super::{ItemKind, Origin};
use serde::Serialize;
use serde_json::Value;

const MAX_TOPICS_PER_WEEK: usize = 6;
const MAX_MILESTONES: usize = 6;
const DEFAULT_MILESTONES: u32 = 3;

/// Validated inputs a plan is reconciled against
#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlanContext {
    pub subject: String,
    pub goal: String,
    pub weeks: u32,
    pub hours_per_week: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekPlan {
    week: u32,
    topics: Vec<String>,
    hours: u32,
    origin: Origin,
}

impl WeekPlan {
    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    pub fn is_filler(&self) -> bool {
        self.origin == Origin::Filler
    }

    fn filler(week: u32, ctx: &StudyPlanContext) -> Self {
        WeekPlan {
            week,
            topics: vec![
                format!("Review and practice: {}", ctx.subject),
                format!("Progress toward goal: {}", ctx.goal),
            ],
            hours: ctx.hours_per_week,
            origin: Origin::Filler,
        }
    }

    fn from_value(value: &Value, ctx: &StudyPlanContext) -> Result<Self, ItemRejection> {
        let object = value.as_object().ok_or(ItemRejection::NotAnObject)?;

        let week = object
            .get("week")
            .ok_or(ItemRejection::MissingField("week"))
            .and_then(|v| {
                loose_number(v).ok_or_else(|| ItemRejection::Malformed("week".to_string()))
            })?;
        if week == 0 || week > u64::from(ctx.weeks) {
            return Err(ItemRejection::OutOfRange { field: "week", value: week });
        }

        let mut topics = string_list(object.get("topics"));
        if topics.is_empty() {
            return Err(ItemRejection::EmptyField("topics"));
        }
        topics.truncate(MAX_TOPICS_PER_WEEK);

        // Missing or absurd hours fall back to the requested weekly budget.
        let hours = object
            .get("hours")
            .and_then(loose_number)
            .filter(|h| (1..=168).contains(h))
            .and_then(|h| u32::try_from(h).ok())
            .unwrap_or(ctx.hours_per_week);

        Ok(WeekPlan {
            week: u32::try_from(week).unwrap_or(ctx.weeks),
            topics,
            hours,
            origin: Origin::Model,
        })
    }
}

/// A reconciled study plan
#[derive(Debug, Clone, PartialEq)]
pub struct StudyPlan {
    pub overview: String,
    pub weekly_schedule: Vec<WeekPlan>,
    pub milestones: Vec<String>,
    pub outcome: RepairOutcome,
    pub dropped: usize,
    pub filler: usize,
}

impl StudyPlan {
    pub const KIND: ItemKind = ItemKind::WeekPlan;
}

/// Evenly spaced checkpoints: `Week w: Milestone i` for i in 1..=3
pub fn default_milestones(ctx: &StudyPlanContext) -> Vec<String> {
    (1..=DEFAULT_MILESTONES)
        .map(|i| {
            let week = (i * ctx.weeks / DEFAULT_MILESTONES).max(1);
            format!("Week {}: Milestone {}", week, i)
        })
        .collect()
}

/// Repair a study plan completion
///
/// Exactly one week entry per week in `1..=weeks`, ordered; the first valid
/// entry for a week wins and missing weeks get filler. Non-JSON text is kept
/// as the overview.
pub fn repair_study_plan(raw: &str, ctx: &StudyPlanContext) -> StudyPlan {
    let text = strip_code_fences(raw);
    let payload = parse_payload(text);

    let (overview, candidates, milestones, mut outcome) = match &payload {
        Some(payload) => (
            payload
                .get("overview")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            payload_items(payload, "weekly_schedule"),
            string_list(payload.get("milestones")),
            RepairOutcome::Parsed,
        ),
        None => (
            text.to_string(),
            Vec::new(),
            Vec::new(),
            RepairOutcome::LineFallback,
        ),
    };

    let weeks = usize::try_from(ctx.weeks).unwrap_or(0);
    let mut slots: Vec<Option<WeekPlan>> = vec![None; weeks];
    let mut dropped = 0;

    for (index, candidate) in candidates.iter().enumerate() {
        match WeekPlan::from_value(candidate, ctx) {
            Ok(plan) => {
                let slot = &mut slots[plan.week as usize - 1];
                if slot.is_none() {
                    *slot = Some(plan);
                } else {
                    dropped += 1;
                }
            }
            Err(reason) => {
                dropped += 1;
                tracing::debug!(index, reason = %reason, "Dropping invalid week entry");
            }
        }
    }

    let weekly_schedule: Vec<WeekPlan> = slots
        .into_iter()
        .zip(1..=ctx.weeks)
        .map(|(slot, week)| slot.unwrap_or_else(|| WeekPlan::filler(week, ctx)))
        .collect();
    let filler = weekly_schedule.iter().filter(|w| w.is_filler()).count();

    let overview = if overview.is_empty() {
        if outcome == RepairOutcome::LineFallback {
            outcome = RepairOutcome::Placeholder;
        }
        format!(
            "Study plan for {} over {} weeks at {} hours per week. Goal: {}",
            ctx.subject, ctx.weeks, ctx.hours_per_week, ctx.goal
        )
    } else {
        overview
    };

    let milestones = if milestones.is_empty() {
        default_milestones(ctx)
    } else {
        milestones.into_iter().take(MAX_MILESTONES).collect()
    };

    if filler > 0 || dropped > 0 {
        tracing::info!(
            kind = StudyPlan::KIND.as_str(),
            outcome = outcome.as_str(),
            weeks = ctx.weeks,
            dropped,
            filler,
            "Study plan needed repair"
        );
    }

    StudyPlan {
        overview,
        weekly_schedule,
        milestones,
        outcome,
        dropped,
        filler,
    }
}
