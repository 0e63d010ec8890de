//! Topic explanations
//!
//! Accepted shapes, in order: a JSON object with `explanation`, `key_points`
//! and `examples`; the sectioned `EXPLANATION:` / `KEY POINTS:` / `EXAMPLES:`
//! text format; free text whose bullet lines become key points.

use super::repair::{
    RepairOutcome, clean_line, parse_payload, string_list, strip_code_fences, strip_label,
};
use serde::Serialize;
use serde_json::Value;

pub const MAX_KEY_POINTS: usize = 5;
pub const MAX_EXAMPLES: usize = 3;

pub const DEFAULT_KEY_POINTS: [&str; 3] = [
    "Understanding requires practice",
    "Break down complex concepts",
    "Connect to real applications",
];

pub const DEFAULT_EXAMPLES: [&str; 3] = [
    "Real-world application example",
    "Practical use case",
    "Common scenario",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub explanation: String,
    pub key_points: Vec<String>,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Explanation,
    KeyPoints,
    Examples,
}

/// Text of a bullet or numbered list line, e.g. `- point`, `• point`, `2. point`
fn bullet_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = trimmed.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 {
        return None;
    }
    trimmed[digits..]
        .strip_prefix(". ")
        .or_else(|| trimmed[digits..].strip_prefix(") "))
        .map(str::trim)
}

fn section_header(line: &str) -> Option<(Section, &str)> {
    let line = clean_line(line);
    if let Some(rest) = strip_label(line, &["explanation"]) {
        return Some((Section::Explanation, rest));
    }
    if let Some(rest) = strip_label(line, &["key points", "key_points"]) {
        return Some((Section::KeyPoints, rest));
    }
    strip_label(line, &["examples"]).map(|rest| (Section::Examples, rest))
}

fn from_json(payload: &Value) -> Option<Explanation> {
    let explanation = payload.get("explanation")?.as_str()?.trim();
    if explanation.is_empty() {
        return None;
    }
    Some(Explanation {
        explanation: explanation.to_string(),
        key_points: string_list(payload.get("key_points")),
        examples: string_list(payload.get("examples")),
    })
}

fn from_sections(text: &str) -> Option<Explanation> {
    let mut current: Option<Section> = None;
    let mut explanation: Vec<&str> = Vec::new();
    let mut key_points = Vec::new();
    let mut examples = Vec::new();

    for line in text.lines() {
        if let Some((section, inline)) = section_header(line) {
            current = Some(section);
            if inline.is_empty() {
                continue;
            }
            match section {
                Section::Explanation => explanation.push(inline),
                Section::KeyPoints => key_points.push(inline.to_string()),
                Section::Examples => examples.push(inline.to_string()),
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match current {
            None => {}
            Some(Section::Explanation) => explanation.push(trimmed),
            Some(Section::KeyPoints) => {
                key_points.push(bullet_text(trimmed).unwrap_or(trimmed).to_string())
            }
            Some(Section::Examples) => {
                examples.push(bullet_text(trimmed).unwrap_or(trimmed).to_string())
            }
        }
    }

    current?;
    Some(Explanation {
        explanation: explanation.join("\n"),
        key_points,
        examples,
    })
}

fn from_free_text(text: &str) -> Explanation {
    let mut explanation: Vec<&str> = Vec::new();
    let mut key_points = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match bullet_text(line) {
            Some(point) if !point.is_empty() => key_points.push(point.to_string()),
            _ => explanation.push(line),
        }
    }

    Explanation {
        explanation: explanation.join("\n"),
        key_points,
        examples: Vec::new(),
    }
}

/// Repair an explanation completion; never fails
pub fn repair_explanation(raw: &str, topic: &str) -> (Explanation, RepairOutcome) {
    let text = strip_code_fences(raw);

    let (mut result, mut outcome) = match parse_payload(text).as_ref().and_then(from_json) {
        Some(parsed) => (parsed, RepairOutcome::Parsed),
        None => match from_sections(text) {
            Some(sectioned) => (sectioned, RepairOutcome::LineFallback),
            None => (from_free_text(text), RepairOutcome::LineFallback),
        },
    };

    if result.explanation.trim().is_empty() {
        result.explanation = format!(
            "An explanation of {} could not be generated. Please try again.",
            topic
        );
        outcome = RepairOutcome::Placeholder;
    }
    if result.key_points.is_empty() {
        result.key_points = DEFAULT_KEY_POINTS.iter().map(|s| s.to_string()).collect();
    }
    if result.examples.is_empty() {
        result.examples = DEFAULT_EXAMPLES.iter().map(|s| s.to_string()).collect();
    }
    result.key_points.truncate(MAX_KEY_POINTS);
    result.examples.truncate(MAX_EXAMPLES);

    (result, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_explanation() {
        let raw = json!({
            "explanation": "Ownership tracks who frees memory.",
            "key_points": ["One owner", "Moves transfer ownership", "Borrows", "Lifetimes", "Drop", "Extra"],
            "examples": ["let s = String::new();"]
        })
        .to_string();
        let (result, outcome) = repair_explanation(&raw, "Ownership");
        assert_eq!(outcome, RepairOutcome::Parsed);
        assert_eq!(result.explanation, "Ownership tracks who frees memory.");
        assert_eq!(result.key_points.len(), MAX_KEY_POINTS);
        assert_eq!(result.examples, vec!["let s = String::new();".to_string()]);
    }

    #[test]
    fn test_sectioned_text() {
        let raw = "\
EXPLANATION:
Photosynthesis converts light into chemical energy.
It happens in chloroplasts.

KEY POINTS:
- Needs sunlight
- Produces oxygen

EXAMPLES:
1. Leaves turning toward the sun
2. Algae in ponds
";
        let (result, outcome) = repair_explanation(raw, "Photosynthesis");
        assert_eq!(outcome, RepairOutcome::LineFallback);
        assert_eq!(
            result.explanation,
            "Photosynthesis converts light into chemical energy.\nIt happens in chloroplasts."
        );
        assert_eq!(result.key_points, vec!["Needs sunlight", "Produces oxygen"]);
        assert_eq!(
            result.examples,
            vec!["Leaves turning toward the sun", "Algae in ponds"]
        );
    }

    #[test]
    fn test_free_text_bullets_become_key_points() {
        let raw = "Gravity pulls masses together.\n- Mass attracts mass\n- Weaker with distance";
        let (result, _) = repair_explanation(raw, "Gravity");
        assert_eq!(result.explanation, "Gravity pulls masses together.");
        assert_eq!(result.key_points, vec!["Mass attracts mass", "Weaker with distance"]);
        assert_eq!(result.examples.len(), DEFAULT_EXAMPLES.len());
    }

    #[test]
    fn test_defaults_when_only_prose() {
        let (result, _) = repair_explanation("Just one paragraph.", "Topic");
        assert_eq!(result.explanation, "Just one paragraph.");
        assert_eq!(result.key_points[0], DEFAULT_KEY_POINTS[0]);
        assert_eq!(result.examples[0], DEFAULT_EXAMPLES[0]);
    }

    #[test]
    fn test_empty_text_is_placeholder() {
        let (result, outcome) = repair_explanation("```\n```", "Entropy");
        assert_eq!(outcome, RepairOutcome::Placeholder);
        assert!(result.explanation.contains("Entropy"));
    }

    #[test]
    fn test_bullet_text() {
        assert_eq!(bullet_text("- a"), Some("a"));
        assert_eq!(bullet_text("• b"), Some("b"));
        assert_eq!(bullet_text("12. c"), Some("c"));
        assert_eq!(bullet_text("3) d"), Some("d"));
        assert_eq!(bullet_text("2024 was a year"), None);
        assert_eq!(bullet_text("plain"), None);
    }
}
