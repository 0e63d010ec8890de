//! Best-effort repair of model output into validated items
//!
//! Steps, in order:
//! 1. Strip a surrounding markdown code fence
//! 2. Strict JSON parse, then a parse of the outermost `{...}` / `[...]` span
//! 3. If nothing parses: labelled-line fallback, then a single placeholder
//! 4. Validate every item, dropping the ones that fail
//! 5. Pad with deterministic filler or truncate to the requested count
//!
//! Repair never fails.

use super::{ItemKind, Origin};
use serde_json::Value;

/// Which path produced the items of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The completion (or a span of it) was valid JSON
    Parsed,
    /// JSON parsing failed, labelled lines were used
    LineFallback,
    /// Nothing usable; a fixed placeholder was substituted
    Placeholder,
}

impl RepairOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairOutcome::Parsed => "parsed",
            RepairOutcome::LineFallback => "line_fallback",
            RepairOutcome::Placeholder => "placeholder",
        }
    }
}

/// Why a single item was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemRejection {
    #[error("item is not a JSON object")]
    NotAnObject,

    #[error("item fields have the wrong types: {0}")]
    Malformed(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("expected exactly 4 options, got {0}")]
    OptionCount(usize),

    #[error("correct answer does not match any option")]
    UnresolvedAnswer,

    #[error("field '{field}' value {value} is out of range")]
    OutOfRange { field: &'static str, value: u64 },
}

/// Result of repairing a completion into a list of items
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub items: Vec<T>,
    pub outcome: RepairOutcome,
    /// Items present in the payload that failed validation
    pub dropped: usize,
    /// Items in `items` that were not produced by the model
    pub filler: usize,
}

/// An item kind that can be recovered from a completion
pub trait RepairItem: Sized {
    const KIND: ItemKind;

    /// Key of the item list in an object payload, e.g. `questions`
    const LIST_KEY: &'static str;

    /// Validate one JSON item
    fn from_value(value: &Value) -> Result<Self, ItemRejection>;

    /// Recover items from labelled plain-text lines
    fn from_lines(text: &str) -> Vec<Self>;

    /// Single item used when the completion yields nothing at all
    fn placeholder(topic: &str) -> Self;

    /// Filler for 1-based result position `position`
    fn filler(topic: &str, position: usize) -> Self;

    fn origin(&self) -> Origin;
}

/// Strip a surrounding markdown code fence and an optional language tag
///
/// Text that does not start with a fence is returned trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The rest of the opening line is the language tag.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse `text` as a JSON object or array
///
/// Falls back to the outermost `{...}` or `[...]` span when the model wrapped
/// the JSON in chatter. Scalars do not count as a payload.
pub fn parse_payload(text: &str) -> Option<Value> {
    if let Some(value) = parse_container(text) {
        return Some(value);
    }

    // Try the span that opens first, so `[{...}]` stays an array.
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| outermost_span(text, open, close))
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().find_map(|(_, span)| parse_container(span))
}

fn parse_container(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

fn outermost_span(text: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| (start, &text[start..=end]))
}

/// Candidate item values in a payload: a bare array, the array under
/// `list_key`, or a single object that is itself an item
pub fn payload_items<'a>(payload: &'a Value, list_key: &str) -> Vec<&'a Value> {
    match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get(list_key) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(_) => Vec::new(),
            None if map.is_empty() => Vec::new(),
            None => vec![payload],
        },
        _ => Vec::new(),
    }
}

/// Validate each candidate, returning the valid items and the drop count
pub fn validate_items<T: RepairItem>(candidates: &[&Value]) -> (Vec<T>, usize) {
    let mut items = Vec::with_capacity(candidates.len());
    let mut dropped = 0;

    for (index, candidate) in candidates.iter().enumerate() {
        match T::from_value(candidate) {
            Ok(item) => items.push(item),
            Err(reason) => {
                dropped += 1;
                tracing::debug!(
                    kind = T::KIND.as_str(),
                    index,
                    reason = %reason,
                    "Dropping invalid item from completion"
                );
            }
        }
    }

    (items, dropped)
}

/// Repair `raw` into exactly `count` items of kind `T`
pub fn repair_items<T: RepairItem>(raw: &str, topic: &str, count: usize) -> Repaired<T> {
    let text = strip_code_fences(raw);

    let (mut items, outcome, dropped) = match parse_payload(text) {
        Some(payload) => {
            let candidates = payload_items(&payload, T::LIST_KEY);
            let (items, dropped) = validate_items::<T>(&candidates);
            (items, RepairOutcome::Parsed, dropped)
        }
        None => {
            let items = T::from_lines(text);
            if items.is_empty() {
                (vec![T::placeholder(topic)], RepairOutcome::Placeholder, 0)
            } else {
                (items, RepairOutcome::LineFallback, 0)
            }
        }
    };

    while items.len() < count {
        let position = items.len() + 1;
        items.push(T::filler(topic, position));
    }
    items.truncate(count);

    let filler = items.iter().filter(|i| i.origin() == Origin::Filler).count();
    if filler > 0 || dropped > 0 {
        tracing::info!(
            kind = T::KIND.as_str(),
            outcome = outcome.as_str(),
            requested = count,
            dropped,
            filler,
            "Completion needed repair"
        );
    }

    Repaired {
        items,
        outcome,
        dropped,
        filler,
    }
}

/// Normalize a plain-text line for label matching: strips list and markdown
/// decoration such as `- `, `**`, `##`
pub(crate) fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['*', '#', '>', '-', ' ', '\t'])
        .trim_end_matches(['*', ' ', '\t'])
}

/// If `line` starts with one of `labels` (case-insensitive), optionally
/// followed by a number, then `:`, return the trimmed text after the colon
///
/// `Question 3: What is...` matches the label `question`.
pub(crate) fn strip_label<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    for label in labels {
        let Some(head) = line.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let rest = line[label.len()..].trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ');
        if let Some(value) = rest.strip_prefix(':') {
            return Some(value.trim().trim_matches('*').trim());
        }
    }
    None
}

/// First run of ASCII digits in `text`, e.g. `60` in `"60 minutes"`
pub(crate) fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Non-empty trimmed string from an optional JSON string field
pub(crate) fn required_text(
    value: Option<String>,
    field: &'static str,
) -> Result<String, ItemRejection> {
    let text = value.ok_or(ItemRejection::MissingField(field))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ItemRejection::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Unsigned integer from a JSON number or a string such as `"Day 3"`
pub(crate) fn loose_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => first_number(s),
        _ => None,
    }
}

/// Non-empty trimmed strings from a JSON array, skipping everything else
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
