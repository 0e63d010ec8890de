//! Study features: prompt, retried completion, repair
//!
//! Every generation method follows the same flow: compose the prompt, run it
//! through the [`RetryingClient`], then repair the raw text into validated
//! output. Provider failures propagate as `AppError`; malformed model output
//! never does.

use crate::config::CallPath;
use crate::error::AppResult;
use crate::generation::explain::repair_explanation;
use crate::generation::repair::{RepairItem, repair_items};
use crate::generation::schedule::repair_schedule;
use crate::generation::study_plan::repair_study_plan;
use crate::generation::{
    Difficulty, Explanation, Flashcard, ItemKind, QuizItem, RepairOutcome, Repaired, Schedule,
    ScheduleContext, StudyPlan, StudyPlanContext, prompt,
};
use crate::metrics::{Endpoint, Metrics};
use crate::provider::{CompletionRequest, RetryingClient};
use std::sync::Arc;

/// Chat follow-ups suggested after every tutor reply
pub const FOLLOW_UP_QUESTIONS: [&str; 3] = [
    "Can you explain this in simpler terms?",
    "What are some practice problems for this topic?",
    "How does this relate to real-world applications?",
];

pub struct StudyService {
    client: RetryingClient,
    metrics: Arc<Metrics>,
}

impl StudyService {
    pub fn new(client: RetryingClient, metrics: Arc<Metrics>) -> Self {
        Self { client, metrics }
    }

    /// Call path of the underlying completion client
    pub fn call_path(&self) -> CallPath {
        self.client.call_path()
    }

    async fn complete(&self, endpoint: Endpoint, request: &CompletionRequest) -> AppResult<String> {
        self.metrics
            .observe("record_request", |m| m.record_request(endpoint));

        let completion = self.client.complete(request).await?;
        tracing::debug!(
            endpoint = endpoint.as_str(),
            attempts = completion.attempts,
            response_length = completion.text.len(),
            "Completion acquired"
        );
        Ok(completion.text)
    }

    fn record_repair(&self, kind: ItemKind, outcome: RepairOutcome, filler: usize) {
        self.metrics
            .observe("record_repair", |m| m.record_repair(kind, outcome));
        self.metrics
            .observe("record_filler", |m| m.record_filler(kind, filler));
    }

    fn finish_items<T: RepairItem>(&self, raw: &str, topic: &str, count: usize) -> Repaired<T> {
        let repaired = repair_items::<T>(raw, topic, count);
        self.record_repair(T::KIND, repaired.outcome, repaired.filler);
        repaired
    }

    /// Tutor reply text
    pub async fn chat(
        &self,
        message: &str,
        subject: Option<&str>,
        difficulty: Difficulty,
    ) -> AppResult<String> {
        let request = prompt::chat_request(message, subject, difficulty);
        let text = self.complete(Endpoint::Chat, &request).await?;
        Ok(text.trim().to_string())
    }

    /// Exactly `count` quiz items
    pub async fn quiz(
        &self,
        topic: &str,
        subject: Option<&str>,
        difficulty: Difficulty,
        count: usize,
    ) -> AppResult<Repaired<QuizItem>> {
        let request = prompt::quiz_request(topic, subject, difficulty, count);
        let raw = self.complete(Endpoint::Quiz, &request).await?;
        Ok(self.finish_items(&raw, topic, count))
    }

    /// Exactly `count` flashcards
    pub async fn flashcards(&self, topic: &str, count: usize) -> AppResult<Repaired<Flashcard>> {
        let request = prompt::flashcard_request(topic, count);
        let raw = self.complete(Endpoint::Flashcards, &request).await?;
        Ok(self.finish_items(&raw, topic, count))
    }

    pub async fn explain(&self, topic: &str, depth: Difficulty) -> AppResult<Explanation> {
        let request = prompt::explain_request(topic, depth);
        let raw = self.complete(Endpoint::Explain, &request).await?;
        let (explanation, outcome) = repair_explanation(&raw, topic);
        self.record_repair(ItemKind::Explanation, outcome, 0);
        Ok(explanation)
    }

    pub async fn schedule(&self, ctx: &ScheduleContext) -> AppResult<Schedule> {
        let request = prompt::schedule_request(&ctx.topics, ctx.hours_per_day, ctx.days);
        let raw = self.complete(Endpoint::Schedule, &request).await?;
        let schedule = repair_schedule(&raw, ctx);
        self.record_repair(Schedule::KIND, schedule.outcome, schedule.filler);
        Ok(schedule)
    }

    pub async fn study_plan(&self, ctx: &StudyPlanContext) -> AppResult<StudyPlan> {
        let request =
            prompt::study_plan_request(&ctx.subject, &ctx.goal, ctx.hours_per_week, ctx.weeks);
        let raw = self.complete(Endpoint::StudyPlan, &request).await?;
        let plan = repair_study_plan(&raw, ctx);
        self.record_repair(StudyPlan::KIND, plan.outcome, plan.filler);
        Ok(plan)
    }
}
