//! Question/answer flashcards

use super::repair::{ItemRejection, RepairItem, clean_line, required_text, strip_label};
use super::{ItemKind, Origin};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filler cards, cycled by position
const FILLER_CARDS: [(&str, &str); 3] = [
    (
        "Why is {topic} important?",
        "Think about where {topic} is used and which problems it solves.",
    ),
    (
        "How is {topic} applied?",
        "Look for practical examples of {topic} in exercises and everyday situations.",
    ),
    (
        "What is an important concept in {topic}?",
        "This is a key concept that requires further study.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flashcard {
    question: String,
    answer: String,
    origin: Origin,
}

impl Flashcard {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_filler(&self) -> bool {
        self.origin == Origin::Filler
    }
}

#[derive(Debug, Deserialize)]
struct RawFlashcard {
    #[serde(alias = "front")]
    question: Option<String>,
    #[serde(alias = "back")]
    answer: Option<String>,
}

impl RepairItem for Flashcard {
    const KIND: ItemKind = ItemKind::Flashcard;
    const LIST_KEY: &'static str = "flashcards";

    fn from_value(value: &Value) -> Result<Self, ItemRejection> {
        if !value.is_object() {
            return Err(ItemRejection::NotAnObject);
        }
        let raw: RawFlashcard = serde_json::from_value(value.clone())
            .map_err(|e| ItemRejection::Malformed(e.to_string()))?;

        Ok(Flashcard {
            question: required_text(raw.question, "question")?,
            answer: required_text(raw.answer, "answer")?,
            origin: Origin::Model,
        })
    }

    /// Pairs `Q:`/`Question:` lines with the following `A:`/`Answer:` line
    fn from_lines(text: &str) -> Vec<Self> {
        let mut cards = Vec::new();
        let mut question: Option<String> = None;

        for line in text.lines().map(clean_line) {
            if let Some(q) = strip_label(line, &["question", "q"]) {
                question = Some(q.to_string()).filter(|q| !q.is_empty());
            } else if let Some(a) = strip_label(line, &["answer", "a"]) {
                if let Some(q) = question.take().filter(|_| !a.is_empty()) {
                    cards.push(Flashcard {
                        question: q,
                        answer: a.to_string(),
                        origin: Origin::Model,
                    });
                }
            }
        }

        cards
    }

    fn placeholder(topic: &str) -> Self {
        Flashcard {
            question: format!("What is {}?", topic),
            answer: format!(
                "{} is the subject of this study set. Review your course material for a full definition.",
                topic
            ),
            origin: Origin::Filler,
        }
    }

    fn filler(topic: &str, position: usize) -> Self {
        let (question, answer) = FILLER_CARDS[(position.saturating_sub(1)) % FILLER_CARDS.len()];
        Flashcard {
            question: question.replace("{topic}", topic),
            answer: answer.replace("{topic}", topic),
            origin: Origin::Filler,
        }
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}
