//! JSON extractor with `{"error": ...}` rejections
//!
//! Request types validate during deserialization, so a rejection here is the
//! only way an invalid request is reported:
//! - malformed JSON or a failed field check -> 400 Bad Request
//! - missing `Content-Type: application/json` -> 415 Unsupported Media Type

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

pub struct ApiJsonRejection(JsonRejection);

impl ApiJsonRejection {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        match &self.0 {
            JsonRejection::MissingJsonContentType(_) => {
                "Content-Type must be application/json".to_string()
            }
            other => other.body_text(),
        }
    }
}

impl IntoResponse for ApiJsonRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        tracing::debug!(status = status.as_u16(), error = %message, "Rejected request body");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Drop-in for `axum::Json` on study endpoints
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiJsonRejection(rejection)),
        }
    }
}
