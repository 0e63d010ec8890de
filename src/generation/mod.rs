//! Prompt composition and completion repair
//!
//! Everything in this module is pure: prompts are rendered from validated
//! request data, and raw completion text is turned into validated items
//! without ever failing. Malformed model output degrades to deterministic
//! filler instead of an error.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod explain;
pub mod flashcard;
pub mod prompt;
pub mod quiz;
pub mod repair;
pub mod schedule;
pub mod study_plan;

pub use explain::Explanation;
pub use flashcard::Flashcard;
pub use quiz::QuizItem;
pub use repair::{RepairOutcome, Repaired};
pub use schedule::{Schedule, ScheduleContext, StudyBlock};
pub use study_plan::{StudyPlan, StudyPlanContext, WeekPlan};

/// Requested difficulty (or explanation depth)
///
/// Accepts the aliases used by the frontends: `easy`/`basic` for beginner,
/// `medium` for intermediate, `hard` for advanced. Matching is
/// case-insensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" | "basic" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "hard" => Ok(Difficulty::Advanced),
            other => Err(format!(
                "unknown difficulty '{}', expected beginner, intermediate or advanced",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Where an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Parsed and validated from the completion
    Model,
    /// Synthesized deterministically to reach the requested count
    Filler,
}

/// Item kinds produced by the repair pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Quiz,
    Flashcard,
    ScheduleBlock,
    Explanation,
    WeekPlan,
}

impl ItemKind {
    /// Prometheus label and log field value
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Quiz => "quiz",
            ItemKind::Flashcard => "flashcard",
            ItemKind::ScheduleBlock => "schedule_block",
            ItemKind::Explanation => "explanation",
            ItemKind::WeekPlan => "week_plan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_aliases() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("Basic".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("medium".parse::<Difficulty>().unwrap(), Difficulty::Intermediate);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_deserializes_aliases() {
        let d: Difficulty = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(d, Difficulty::Intermediate);
        assert!(serde_json::from_str::<Difficulty>("\"impossible\"").is_err());
    }

    #[test]
    fn test_difficulty_serializes_canonical_name() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Beginner).unwrap(),
            "\"beginner\""
        );
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Origin::Filler).unwrap(), "\"filler\"");
        assert_eq!(serde_json::to_string(&Origin::Model).unwrap(), "\"model\"");
    }
}
