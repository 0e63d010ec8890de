//! Field checks shared by the request types
//!
//! Each returns the message handed to `serde::de::Error::custom`, so a failed
//! check surfaces as a 400 with the field named.

use std::ops::RangeInclusive;

/// Longest accepted topic, subject or goal
pub const MAX_TEXT_CHARS: usize = 500;

/// Longest accepted chat message
pub const MAX_MESSAGE_CHARS: usize = 10_000;

pub const COUNT_RANGE: RangeInclusive<u32> = 1..=20;
pub const DEFAULT_COUNT: u32 = 5;

/// Non-empty after trimming and at most `max_chars` characters; returns the
/// trimmed text
pub fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{} cannot be empty or contain only whitespace", field));
    }
    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(format!(
            "{} exceeds maximum length of {} characters (got {})",
            field, max_chars, chars
        ));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`], but blank input means "not given"
pub fn optional_text(
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> Result<Option<String>, String> {
    match value {
        Some(v) if !v.trim().is_empty() => required_text(field, &v, max_chars).map(Some),
        _ => Ok(None),
    }
}

pub fn in_range(field: &str, value: u32, range: RangeInclusive<u32>) -> Result<u32, String> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} must be between {} and {} (got {})",
            field,
            range.start(),
            range.end(),
            value
        ))
    }
}
