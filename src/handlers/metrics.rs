//! Prometheus scrape endpoint

use axum::{extract::State, http::StatusCode};

use crate::handlers::AppState;

/// GET /metrics in Prometheus text format
///
/// ```bash
/// curl http://localhost:8000/metrics
/// # HELP studybuddy_requests_total Total number of study requests by endpoint
/// # TYPE studybuddy_requests_total counter
/// studybuddy_requests_total{endpoint="quiz"} 3
/// ```
pub async fn handler(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics().gather() {
        Ok(output) => (StatusCode::OK, output),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}
