//! Translates [`AppError`] into the HTTP status codes of spec §7. Every
//! handler returns `Result<T, ApiError>` so this is the one place the
//! mapping happens.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carbonledger_core::error::AppError;
use serde_json::json;

pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Auth => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            AppError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "transient_error"),
            AppError::FatalTask(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        tracing::error!(error = %self.0, code, "request failed");

        (status, Json(json!({ "error": code, "message": self.0.to_string() }))).into_response()
    }
}

/// 413, raised directly by upload handlers before an [`AppError`] would
/// otherwise apply (file too large to even parse).
pub struct PayloadTooLarge(pub &'static str);

impl IntoResponse for PayloadTooLarge {
    fn into_response(self) -> Response {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": "payload_too_large", "message": self.0 })),
        )
            .into_response()
    }
}
