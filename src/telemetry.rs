//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use crate::config::{LogFormat, ObservabilityConfig};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter used when RUST_LOG is unset
pub fn default_filter(level: &str) -> String {
    format!("studybuddy={},tower_http=debug", level)
}

/// Initialize the tracing subscriber
///
/// Only the first call per process has any effect. RUST_LOG, when set,
/// replaces the configured level.
///
/// ```no_run
/// let config = studybuddy::config::ObservabilityConfig::default();
/// studybuddy::telemetry::init(&config);
/// tracing::info!("Application started");
/// ```
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match config.log_format {
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
                .try_init(),
        };

        // Another subscriber may already be installed (tests, embedding).
        if let Err(e) = result {
            eprintln!("tracing subscriber not installed: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_crate() {
        assert_eq!(default_filter("debug"), "studybuddy=debug,tower_http=debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = ObservabilityConfig {
            log_level: "warn".to_string(),
            log_format: LogFormat::Json,
        };
        init(&config);
        init(&ObservabilityConfig::default());
    }
}
