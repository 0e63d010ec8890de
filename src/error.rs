//! Error types for StudyBuddy
//!
//! All errors implement `IntoResponse` for Axum handlers.

use crate::provider::ProviderError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message shown to clients when the provider stays busy through every retry.
pub const SERVICE_BUSY_MESSAGE: &str =
    "AI service is busy, please try again in a moment";

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    /// The provider failed with an error that retrying will not fix.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every attempt hit a transient provider failure.
    #[error("AI service is busy (gave up after {attempts} attempts: {last_error})")]
    ServiceBusy { attempts: u32, last_error: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ServiceBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider(_)
            | Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Validation(msg) | Self::Config(msg) | Self::Internal(msg) => msg.clone(),
            // The retry details stay in the logs, clients get the short message.
            Self::ServiceBusy { .. } => SERVICE_BUSY_MESSAGE.to_string(),
            _ => self.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
