//! Multiple-choice quiz items

use super::repair::{ItemRejection, RepairItem, clean_line, required_text, strip_label};
use super::{ItemKind, Origin};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Number of options every quiz item carries
pub const OPTION_COUNT: usize = 4;

const FILLER_OPTIONS: [&str; OPTION_COUNT] = [
    "Fundamental concept A",
    "Basic principle B",
    "Core idea C",
    "Essential element D",
];

const PLACEHOLDER_OPTIONS: [&str; OPTION_COUNT] = [
    "Option A - Correct answer",
    "Option B",
    "Option C",
    "Option D",
];

/// A validated multiple-choice question
///
/// Invariant: exactly four options and `options[correct_index] == correct_answer`.
/// The only constructor is [`QuizItem::new`], which enforces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizItem {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    correct_index: usize,
    explanation: String,
    origin: Origin,
}

impl QuizItem {
    pub fn new(
        question: String,
        options: Vec<String>,
        correct_index: usize,
        explanation: String,
        origin: Origin,
    ) -> Result<Self, ItemRejection> {
        if options.len() != OPTION_COUNT {
            return Err(ItemRejection::OptionCount(options.len()));
        }
        let correct_answer = options
            .get(correct_index)
            .cloned()
            .ok_or(ItemRejection::UnresolvedAnswer)?;
        Ok(Self {
            question,
            options,
            correct_answer,
            correct_index,
            explanation,
            origin,
        })
    }

    /// Build from trusted constant data; the option array length is fixed by type
    fn fixed(
        question: String,
        options: [&str; OPTION_COUNT],
        explanation: String,
        origin: Origin,
    ) -> Self {
        Self {
            question,
            correct_answer: options[0].to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index: 0,
            explanation,
            origin,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_filler(&self) -> bool {
        self.origin == Origin::Filler
    }
}

#[derive(Debug, Deserialize)]
struct RawQuizItem {
    question: Option<String>,
    options: Option<Vec<Value>>,
    #[serde(alias = "answer")]
    correct_answer: Option<Value>,
    correct_index: Option<Value>,
    explanation: Option<String>,
}

/// Resolve the model's answer to an option index
///
/// Tried in order: exact option text, case-insensitive option text, a letter
/// `A`-`D` (optionally followed by `)` `.` `:`), a 0-based index.
pub fn resolve_answer(options: &[String], answer: &Value) -> Option<usize> {
    match answer {
        Value::String(text) => {
            let text = text.trim();
            if let Some(i) = options.iter().position(|o| o == text) {
                return Some(i);
            }
            if let Some(i) = options.iter().position(|o| o.eq_ignore_ascii_case(text)) {
                return Some(i);
            }
            let letter = text.trim_end_matches([')', '.', ':']).trim();
            if let Some(i) = letter_index(letter) {
                return Some(i);
            }
            text.parse::<usize>().ok().filter(|i| *i < options.len())
        }
        Value::Number(n) => n
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < options.len()),
        _ => None,
    }
}

fn letter_index(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    let letter = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    match letter.to_ascii_uppercase() {
        'A' => Some(0),
        'B' => Some(1),
        'C' => Some(2),
        'D' => Some(3),
        _ => None,
    }
}

fn option_text(value: &Value) -> Result<String, ItemRejection> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return Err(ItemRejection::Malformed("option is not text".to_string())),
    };
    if text.is_empty() {
        return Err(ItemRejection::EmptyField("options"));
    }
    Ok(text)
}

/// Parse an option line such as `A) Paris`, `b. Paris` or `(C) Paris`
fn option_line(line: &str) -> Option<&str> {
    let (letter, rest) = match line.strip_prefix('(') {
        Some(inner) => {
            let mut chars = inner.chars();
            let letter = chars.next()?;
            (letter, chars.as_str().strip_prefix(')')?)
        }
        None => {
            let mut chars = line.chars();
            let letter = chars.next()?;
            let rest = chars.as_str();
            (letter, rest.strip_prefix(')').or_else(|| rest.strip_prefix('.'))?)
        }
    };
    letter_index(&letter.to_string())?;
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

#[derive(Default)]
struct PendingQuestion {
    question: String,
    options: Vec<String>,
    answer: Option<String>,
    explanation: Option<String>,
}

impl PendingQuestion {
    fn finish(self) -> Option<QuizItem> {
        let value = json!({
            "question": self.question,
            "options": self.options,
            "correct_answer": self.answer,
            "explanation": self.explanation.unwrap_or_default(),
        });
        QuizItem::from_value(&value).ok()
    }
}

impl RepairItem for QuizItem {
    const KIND: ItemKind = ItemKind::Quiz;
    const LIST_KEY: &'static str = "questions";

    fn from_value(value: &Value) -> Result<Self, ItemRejection> {
        if !value.is_object() {
            return Err(ItemRejection::NotAnObject);
        }
        let raw: RawQuizItem = serde_json::from_value(value.clone())
            .map_err(|e| ItemRejection::Malformed(e.to_string()))?;

        let question = required_text(raw.question, "question")?;
        let explanation = raw
            .explanation
            .ok_or(ItemRejection::MissingField("explanation"))?
            .trim()
            .to_string();

        let options = raw
            .options
            .ok_or(ItemRejection::MissingField("options"))?
            .iter()
            .map(option_text)
            .collect::<Result<Vec<_>, _>>()?;
        if options.len() != OPTION_COUNT {
            return Err(ItemRejection::OptionCount(options.len()));
        }

        let answer = raw
            .correct_answer
            .or(raw.correct_index)
            .ok_or(ItemRejection::MissingField("correct_answer"))?;
        let correct_index =
            resolve_answer(&options, &answer).ok_or(ItemRejection::UnresolvedAnswer)?;

        QuizItem::new(question, options, correct_index, explanation, Origin::Model)
    }

    fn from_lines(text: &str) -> Vec<Self> {
        let mut items = Vec::new();
        let mut pending: Option<PendingQuestion> = None;

        for line in text.lines().map(clean_line).filter(|l| !l.is_empty()) {
            if let Some(question) = strip_label(line, &["question", "q"]) {
                if let Some(item) = pending.take().and_then(PendingQuestion::finish) {
                    items.push(item);
                }
                pending = Some(PendingQuestion {
                    question: question.to_string(),
                    ..PendingQuestion::default()
                });
                continue;
            }

            let Some(current) = pending.as_mut() else {
                continue;
            };
            if let Some(option) = option_line(line) {
                current.options.push(option.to_string());
            } else if let Some(answer) =
                strip_label(line, &["correct answer", "answer", "correct"])
            {
                current.answer = Some(answer.to_string());
            } else if let Some(explanation) = strip_label(line, &["explanation"]) {
                current.explanation = Some(explanation.to_string());
            }
        }

        if let Some(item) = pending.and_then(PendingQuestion::finish) {
            items.push(item);
        }
        items
    }

    fn placeholder(topic: &str) -> Self {
        QuizItem::fixed(
            format!("Question 1 about {}", topic),
            PLACEHOLDER_OPTIONS,
            "The AI response could not be read. Try generating the quiz again.".to_string(),
            Origin::Filler,
        )
    }

    fn filler(topic: &str, position: usize) -> Self {
        QuizItem::fixed(
            format!(
                "Review question {}: What is an important aspect of {}?",
                position, topic
            ),
            FILLER_OPTIONS,
            format!(
                "General review question. Revisit the fundamentals of {} to strengthen your understanding.",
                topic
            ),
            Origin::Filler,
        )
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}
