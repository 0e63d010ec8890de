//! StudyBuddy - AI study assistant backend
//!
//! Forwards tutor chat and study-content requests to an OpenAI-compatible
//! provider, retries transient failures with exponential backoff, and repairs
//! the model output into validated quizzes, flashcards, explanations,
//! schedules and study plans.

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod provider;
pub mod service;
pub mod telemetry;
