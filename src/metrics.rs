//! Prometheus metrics collection for StudyBuddy
//!
//! Tracks:
//! - Requests by endpoint
//! - Provider attempts by call path and outcome, plus attempt latency
//! - Repair outcomes and filler items by item kind
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::config::CallPath;
use crate::generation::{ItemKind, RepairOutcome};
use crate::provider::AttemptOutcome;
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Study endpoint enum for type-safe metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    Quiz,
    Flashcards,
    Explain,
    Schedule,
    StudyPlan,
}

impl Endpoint {
    /// Convert endpoint to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Chat => "chat",
            Endpoint::Quiz => "quiz",
            Endpoint::Flashcards => "flashcards",
            Endpoint::Explain => "explain",
            Endpoint::Schedule => "schedule",
            Endpoint::StudyPlan => "study_plan",
        }
    }
}

/// Metrics collector for StudyBuddy
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: CounterVec,
    provider_attempts: CounterVec,
    provider_latency: HistogramVec,
    repair_outcomes: CounterVec,
    filler_items: CounterVec,
    metrics_recording_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance with its own registry
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 6 endpoints
        let requests_total = CounterVec::new(
            Opts::new(
                "studybuddy_requests_total",
                "Total number of study requests by endpoint",
            ),
            &["endpoint"],
        )?;

        // Cardinality: 2 call paths x 3 outcomes
        let provider_attempts = CounterVec::new(
            Opts::new(
                "studybuddy_provider_attempts_total",
                "Provider call attempts by call path and outcome (success, transient, fatal)",
            ),
            &["call_path", "outcome"],
        )?;

        let provider_latency = HistogramVec::new(
            HistogramOpts::new(
                "studybuddy_provider_latency_ms",
                "Latency of a single provider attempt in milliseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
            ]),
            &["call_path"],
        )?;

        // Cardinality: 4 item kinds x 3 outcomes
        let repair_outcomes = CounterVec::new(
            Opts::new(
                "studybuddy_repair_outcomes_total",
                "How raw completions were turned into items (parsed, line_fallback, placeholder)",
            ),
            &["kind", "outcome"],
        )?;

        let filler_items = CounterVec::new(
            Opts::new(
                "studybuddy_filler_items_total",
                "Items synthesized because the completion did not provide enough valid ones",
            ),
            &["kind"],
        )?;

        let metrics_recording_failures = IntCounterVec::new(
            Opts::new(
                "studybuddy_metrics_recording_failures_total",
                "Metrics recording operation failures by operation. \
                Indicates Prometheus internal errors.",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(provider_attempts.clone()))?;
        registry.register(Box::new(provider_latency.clone()))?;
        registry.register(Box::new(repair_outcomes.clone()))?;
        registry.register(Box::new(filler_items.clone()))?;
        registry.register(Box::new(metrics_recording_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            provider_attempts,
            provider_latency,
            repair_outcomes,
            filler_items,
            metrics_recording_failures,
        })
    }

    /// Record a request to a study endpoint
    pub fn record_request(&self, endpoint: Endpoint) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[endpoint.as_str()])?
            .inc();
        Ok(())
    }

    /// Record one provider attempt and how it ended
    pub fn record_attempt(
        &self,
        call_path: CallPath,
        outcome: AttemptOutcome,
    ) -> Result<(), prometheus::Error> {
        self.provider_attempts
            .get_metric_with_label_values(&[call_path.as_str(), outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record the latency of one provider attempt
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_ms` is NaN, infinite or negative; such
    /// values would corrupt every percentile of the histogram.
    pub fn record_provider_latency(
        &self,
        call_path: CallPath,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.provider_latency
            .get_metric_with_label_values(&[call_path.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    /// Record which repair path produced a response's items
    pub fn record_repair(
        &self,
        kind: ItemKind,
        outcome: RepairOutcome,
    ) -> Result<(), prometheus::Error> {
        self.repair_outcomes
            .get_metric_with_label_values(&[kind.as_str(), outcome.as_str()])?
            .inc();
        Ok(())
    }

    /// Record synthesized filler items; zero is a no-op
    pub fn record_filler(&self, kind: ItemKind, count: usize) -> Result<(), prometheus::Error> {
        if count == 0 {
            return Ok(());
        }
        self.filler_items
            .get_metric_with_label_values(&[kind.as_str()])?
            .inc_by(count as f64);
        Ok(())
    }

    /// Record a metrics recording operation failure
    ///
    /// Callers log the underlying error and continue; metrics never fail a
    /// request.
    pub fn metrics_recording_failure(&self, operation: &str) {
        self.metrics_recording_failures
            .with_label_values(&[operation])
            .inc();
    }

    /// Total metrics recording failures across all operations
    pub fn metrics_recording_failures_count(&self) -> u64 {
        let metric_families = self.registry.gather();
        metric_families
            .iter()
            .find(|mf| mf.name() == "studybuddy_metrics_recording_failures_total")
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.counter.value.unwrap_or(0.0) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Run a recording closure, logging and counting a failure instead of
    /// propagating it
    pub fn observe<F>(&self, operation: &str, record: F)
    where
        F: FnOnce(&Self) -> Result<(), prometheus::Error>,
    {
        if let Err(e) = record(self) {
            tracing::warn!(
                operation,
                error = %e,
                "Metrics recording failed, continuing"
            );
            self.metrics_recording_failure(operation);
        }
    }

    /// Gather all metrics and encode them in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_count,
                    "Prometheus text encoder failed"
                );
                prometheus::Error::Msg(format!(
                    "Failed to encode {} metric families: {}",
                    metric_count, e
                ))
            })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
