use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use nanobatch::error::{ConfigError, GenerationError, JobError, NanobatchError};

/// Handler error rendered as `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] NanobatchError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

fn not_found() -> (StatusCode, &'static str, String) {
    (StatusCode::NOT_FOUND, "NOT_FOUND", "not found".to_string())
}

fn internal(message: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %message, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_job_error(err: &JobError) -> (StatusCode, &'static str, String) {
    match err {
        JobError::NotFound(_) | JobError::ArtifactNotFound { .. } | JobError::InvalidArtifactName(_) => {
            not_found()
        }
        JobError::Storage(e) => internal(&e.to_string()),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Engine(NanobatchError::Spec(e)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Engine(NanobatchError::Generation(GenerationError::MissingApiKey)) => (
                StatusCode::BAD_REQUEST,
                "API_KEY_MISSING",
                "API key is not set".to_string(),
            ),
            AppError::Engine(NanobatchError::Job(e)) | AppError::Job(e) => classify_job_error(e),
            AppError::Engine(other) => internal(&other.to_string()),
            AppError::Config(e) => internal(&e.to_string()),
            AppError::Internal(message) => internal(message),
        };

        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}
