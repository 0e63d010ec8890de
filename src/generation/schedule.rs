//! Multi-day study schedules
//!
//! Schedules are reconciled by day rather than by count: every day in
//! `1..=days` ends up with at least one block, and no day exceeds the daily
//! minute budget.

use super::repair::{
    ItemRejection, RepairOutcome, clean_line, first_number, loose_number, parse_payload,
    payload_items, required_text, string_list, strip_code_fences,
};
use super::{ItemKind, Origin};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tips used when the completion provides none
pub const DEFAULT_TIPS: [&str; 5] = [
    "Take regular breaks every 45-60 minutes",
    "Review previous day's material before starting new topics",
    "Practice active recall and self-testing",
    "Create summary notes at the end of each session",
    "Stay hydrated and get enough sleep",
];

const MAX_TIPS: usize = 5;

/// Validated inputs a schedule is reconciled against
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleContext {
    pub topics: Vec<String>,
    pub days: u32,
    pub hours_per_day: u32,
}

impl ScheduleContext {
    pub fn daily_minutes(&self) -> u32 {
        self.hours_per_day.saturating_mul(60)
    }

    /// Equal split of the daily minutes across the requested topics
    pub fn minutes_per_topic(&self) -> u32 {
        let topics = u32::try_from(self.topics.len().max(1)).unwrap_or(u32::MAX);
        (self.daily_minutes() / topics).max(1)
    }

    pub fn total_hours(&self) -> u32 {
        self.hours_per_day.saturating_mul(self.days)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyBlock {
    day: u32,
    topic: String,
    /// Minutes
    duration: u32,
    focus_area: String,
    origin: Origin,
}

impl StudyBlock {
    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn focus_area(&self) -> &str {
        &self.focus_area
    }

    pub fn is_filler(&self) -> bool {
        self.origin == Origin::Filler
    }

    fn filler(day: u32, topic: &str, minutes: u32) -> Self {
        StudyBlock {
            day,
            topic: topic.to_string(),
            duration: minutes,
            focus_area: format!("Core concepts and practice for {}", topic),
            origin: Origin::Filler,
        }
    }

    /// Validate one JSON block against the schedule bounds
    pub fn from_value(value: &Value, ctx: &ScheduleContext) -> Result<Self, ItemRejection> {
        #[derive(Deserialize)]
        struct RawStudyBlock {
            day: Option<Value>,
            topic: Option<String>,
            #[serde(alias = "duration_minutes", alias = "minutes")]
            duration: Option<Value>,
            #[serde(alias = "focus")]
            focus_area: Option<String>,
        }

        if !value.is_object() {
            return Err(ItemRejection::NotAnObject);
        }
        let raw: RawStudyBlock = serde_json::from_value(value.clone())
            .map_err(|e| ItemRejection::Malformed(e.to_string()))?;

        let day = raw
            .day
            .as_ref()
            .ok_or(ItemRejection::MissingField("day"))
            .and_then(|v| {
                loose_number(v).ok_or_else(|| ItemRejection::Malformed("day".to_string()))
            })?;
        if day == 0 || day > u64::from(ctx.days) {
            return Err(ItemRejection::OutOfRange { field: "day", value: day });
        }

        let duration = raw
            .duration
            .as_ref()
            .ok_or(ItemRejection::MissingField("duration"))
            .and_then(|v| {
                loose_number(v).ok_or_else(|| ItemRejection::Malformed("duration".to_string()))
            })?;
        if duration == 0 || duration > u64::from(ctx.daily_minutes()) {
            return Err(ItemRejection::OutOfRange {
                field: "duration",
                value: duration,
            });
        }

        Ok(StudyBlock {
            // Both bounds were checked against u32 values above.
            day: u32::try_from(day).unwrap_or(ctx.days),
            duration: u32::try_from(duration).unwrap_or(ctx.daily_minutes()),
            topic: required_text(raw.topic, "topic")?,
            focus_area: required_text(raw.focus_area, "focus_area")?,
            origin: Origin::Model,
        })
    }
}

/// A reconciled schedule
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub blocks: Vec<StudyBlock>,
    pub tips: Vec<String>,
    pub total_hours: u32,
    pub outcome: RepairOutcome,
    pub dropped: usize,
    pub filler: usize,
}

impl Schedule {
    pub const KIND: ItemKind = ItemKind::ScheduleBlock;
}

/// Parse `Day 3: Algebra - Factoring drills (45 min)`
fn parse_day_line(line: &str, ctx: &ScheduleContext) -> Option<Value> {
    let line = clean_line(line);
    let head = line.get(..3)?;
    if !head.eq_ignore_ascii_case("day") {
        return None;
    }
    let rest = line[3..].trim_start();
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let day: u32 = rest[..digits_end].parse().ok()?;
    let body = rest[digits_end..]
        .trim_start_matches(|c: char| c == ':' || c == '-' || c == '*' || c.is_whitespace())
        .trim();

    let (body, duration) = match body.rfind('(') {
        Some(open) => {
            let minutes = first_number(&body[open..]).and_then(|m| u32::try_from(m).ok());
            (body[..open].trim(), minutes)
        }
        None => (body, None),
    };

    let (topic, focus) = match body.split_once(" - ") {
        Some((topic, focus)) => (topic.trim(), focus.trim()),
        None => (body, "Study session"),
    };

    Some(json!({
        "day": day,
        "topic": topic,
        "duration": duration.unwrap_or_else(|| ctx.minutes_per_topic()),
        "focus_area": focus,
    }))
}

/// Repair a schedule completion
///
/// Invalid blocks and blocks that would push their day past the daily budget
/// are dropped. Days left without any block get one filler block per
/// requested topic. Blocks are ordered by day.
pub fn repair_schedule(raw: &str, ctx: &ScheduleContext) -> Schedule {
    let text = strip_code_fences(raw);

    let (candidates, tips, mut outcome): (Vec<Value>, Vec<String>, RepairOutcome) =
        match parse_payload(text) {
            Some(payload) => {
                let candidates = payload_items(&payload, "schedule")
                    .into_iter()
                    .cloned()
                    .collect();
                let tips = string_list(payload.get("tips"));
                (candidates, tips, RepairOutcome::Parsed)
            }
            None => {
                let candidates = text
                    .lines()
                    .filter_map(|line| parse_day_line(line, ctx))
                    .collect();
                (candidates, Vec::new(), RepairOutcome::LineFallback)
            }
        };

    let days = usize::try_from(ctx.days).unwrap_or(0);
    let mut used_minutes = vec![0u32; days + 1];
    let mut blocks = Vec::with_capacity(candidates.len());
    let mut dropped = 0;

    for (index, candidate) in candidates.iter().enumerate() {
        let block = match StudyBlock::from_value(candidate, ctx) {
            Ok(block) => block,
            Err(reason) => {
                dropped += 1;
                tracing::debug!(index, reason = %reason, "Dropping invalid schedule block");
                continue;
            }
        };
        let day = block.day as usize;
        let used = used_minutes[day].saturating_add(block.duration);
        if used > ctx.daily_minutes() {
            dropped += 1;
            tracing::debug!(index, day = block.day, "Dropping block over the daily budget");
            continue;
        }
        used_minutes[day] = used;
        blocks.push(block);
    }

    if blocks.is_empty() && outcome == RepairOutcome::LineFallback {
        outcome = RepairOutcome::Placeholder;
    }

    let minutes = ctx.minutes_per_topic();
    for day in 1..=ctx.days {
        if blocks.iter().any(|b| b.day == day) {
            continue;
        }
        blocks.extend(
            ctx.topics
                .iter()
                .map(|topic| StudyBlock::filler(day, topic, minutes)),
        );
    }
    blocks.sort_by_key(|b| b.day);

    let filler = blocks.iter().filter(|b| b.is_filler()).count();
    let tips = if tips.is_empty() {
        DEFAULT_TIPS.iter().map(|t| t.to_string()).collect()
    } else {
        tips.into_iter().take(MAX_TIPS).collect()
    };

    if filler > 0 || dropped > 0 {
        tracing::info!(
            kind = Schedule::KIND.as_str(),
            outcome = outcome.as_str(),
            days = ctx.days,
            dropped,
            filler,
            "Schedule needed repair"
        );
    }

    Schedule {
        blocks,
        tips,
        total_hours: ctx.total_hours(),
        outcome,
        dropped,
        filler,
    }
}
