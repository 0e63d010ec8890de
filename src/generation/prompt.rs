//! Prompt composition
//!
//! Each study feature has a fixed system instruction and a composer that
//! renders the user prompt with an explicit output contract. Composers are
//! pure and cannot fail. User-supplied text is truncated on a char boundary
//! before interpolation.

use super::Difficulty;
use crate::provider::CompletionRequest;

/// Longest topic / subject / goal text interpolated into a prompt
pub const MAX_TOPIC_CHARS: usize = 200;

/// Longest chat message interpolated into a prompt
pub const MAX_MESSAGE_CHARS: usize = 4000;

pub const TUTOR_SYSTEM_PROMPT: &str = "\
You are StudyBuddy, an expert AI tutor and study assistant.

Your role is to:
1. Explain complex concepts in clear, understandable ways
2. Adapt explanations to the student's difficulty level (beginner, intermediate, advanced)
3. Provide relevant examples and analogies
4. Break down problems step-by-step
5. Encourage learning with positive reinforcement
6. Suggest study strategies and techniques

Use simple language for beginners and more technical terms for advanced students. \
Focus on understanding, not memorization. \
Format your responses clearly, using markdown when helpful.";

pub const GENERATOR_SYSTEM_PROMPT: &str = "\
You are a study content generator. \
Return ONLY valid JSON, no markdown formatting and no text before or after the JSON.";

pub const QUIZ_SYSTEM_PROMPT: &str = "\
You are a quiz generator. Create multiple-choice questions with exactly 4 options each. \
Questions should test comprehension and application, not just recall. \
One option must be correct, three must be plausible but incorrect. \
Include an explanation for why the correct answer is right. \
Return ONLY valid JSON, no markdown formatting.";

/// Truncate `text` to at most `max_chars` characters, marking the cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}... [truncated]", truncated)
}

fn topic(text: &str) -> String {
    truncate_chars(text, MAX_TOPIC_CHARS)
}

pub fn chat_request(message: &str, subject: Option<&str>, difficulty: Difficulty) -> CompletionRequest {
    let subject = subject.map(topic).unwrap_or_else(|| "General".to_string());
    let prompt = format!(
        "Subject: {}\nDifficulty: {}\n\n{}",
        subject,
        difficulty,
        truncate_chars(message, MAX_MESSAGE_CHARS)
    );
    CompletionRequest::new(TUTOR_SYSTEM_PROMPT, prompt)
        .with_temperature(0.7)
        .with_max_tokens(1000)
}

pub fn quiz_request(
    quiz_topic: &str,
    subject: Option<&str>,
    difficulty: Difficulty,
    count: usize,
) -> CompletionRequest {
    let context = match subject {
        Some(subject) => format!("{} (subject: {})", topic(quiz_topic), topic(subject)),
        None => topic(quiz_topic),
    };
    let prompt = format!(
        "Generate {count} {difficulty} multiple-choice questions about: {context}\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"questions\": [{{\"question\": \"...\", \
         \"options\": [\"Option 1\", \"Option 2\", \"Option 3\", \"Option 4\"], \
         \"correct_answer\": \"Option 1\", \"explanation\": \"...\"}}]}}\n\n\
         \"correct_answer\" must repeat the exact text of the correct option. \
         The list must contain exactly {count} questions. No other text, just the JSON."
    );
    CompletionRequest::new(QUIZ_SYSTEM_PROMPT, prompt)
        .with_temperature(0.8)
        .with_max_tokens(2000)
}

pub fn flashcard_request(card_topic: &str, count: usize) -> CompletionRequest {
    let prompt = format!(
        "Generate {count} flashcards about: {}\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"flashcards\": [{{\"question\": \"...\", \"answer\": \"...\"}}]}}\n\n\
         Keep answers short and factual. The list must contain exactly {count} flashcards. \
         No other text, just the JSON.",
        topic(card_topic)
    );
    CompletionRequest::new(GENERATOR_SYSTEM_PROMPT, prompt)
        .with_temperature(0.7)
        .with_max_tokens(1500)
}

pub fn explain_request(explain_topic: &str, depth: Difficulty) -> CompletionRequest {
    let prompt = format!(
        "Explain the following topic at a {depth} level: {}\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"explanation\": \"...\", \"key_points\": [\"...\", \"...\", \"...\"], \
         \"examples\": [\"...\", \"...\", \"...\"]}}\n\n\
         Give 3 to 5 key points and up to 3 concrete examples. No other text, just the JSON.",
        topic(explain_topic)
    );
    CompletionRequest::new(GENERATOR_SYSTEM_PROMPT, prompt)
        .with_temperature(0.7)
        .with_max_tokens(1500)
}

pub fn schedule_request(topics: &[String], hours_per_day: u32, days: u32) -> CompletionRequest {
    let topics = topics.iter().map(|t| topic(t)).collect::<Vec<_>>().join(", ");
    let prompt = format!(
        "Create a {days}-day study schedule for these topics: {topics}\n\
         Available time: {hours_per_day} hours per day\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"schedule\": [{{\"day\": 1, \"topic\": \"...\", \"duration\": 60, \
         \"focus_area\": \"...\"}}], \"total_hours\": {total}, \"tips\": [\"...\"]}}\n\n\
         Duration is in minutes and a day's blocks must not exceed {minutes} minutes in total. \
         Distribute topics across all {days} days. No other text, just the JSON.",
        total = hours_per_day * days,
        minutes = hours_per_day * 60,
    );
    CompletionRequest::new(GENERATOR_SYSTEM_PROMPT, prompt)
        .with_temperature(0.7)
        .with_max_tokens(2000)
}

pub fn study_plan_request(
    subject: &str,
    goal: &str,
    hours_per_week: u32,
    weeks: u32,
) -> CompletionRequest {
    let prompt = format!(
        "Create a detailed study plan for:\n\
         - Subject: {}\n\
         - Goal: {}\n\
         - Available time: {hours_per_week} hours/week\n\
         - Duration: {weeks} weeks\n\n\
         Return ONLY a JSON object with this structure:\n\
         {{\"overview\": \"...\", \"weekly_schedule\": [{{\"week\": 1, \
         \"topics\": [\"...\", \"...\"], \"hours\": {hours_per_week}}}], \
         \"milestones\": [\"Week 1: ...\"]}}\n\n\
         Include one entry per week from 1 to {weeks}. No other text, just the JSON.",
        topic(subject),
        topic(goal),
    );
    CompletionRequest::new(GENERATOR_SYSTEM_PROMPT, prompt)
        .with_temperature(0.7)
        .with_max_tokens(2000)
}
