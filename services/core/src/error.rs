//! The error taxonomy from spec §7, shared by every crate so that HTTP
//! translation happens in exactly one place: the API layer.

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// A typed result union at the service boundary (spec §9's redesign flag:
/// "exceptions as control flow" becomes this enum instead of HTTP
/// exceptions raised deep inside business logic).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("authentication required")]
    Auth,

    #[error("forbidden: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited")]
    RateLimited,

    #[error("upstream provider error: {0}")]
    Provider(String),

    #[error("transient error, retry: {0}")]
    Transient(String),

    #[error("fatal task error: {0}")]
    FatalTask(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether a worker encountering this error should retry rather than
    /// dead-letter immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transient(_) | AppError::Provider(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            other => AppError::Transient(other.to_string()),
        }
    }
}
