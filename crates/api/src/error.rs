use alertproxy_db::StoreError;
use alertproxy_loki::LokiError;
use alertproxy_worker::QueueError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::extractor::ExtractionError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`ExtractionError`] for webhook processing and [`StoreError`] for
/// status lookups. Implements [`IntoResponse`] to produce consistent JSON
/// error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Extraction failed before a job could be created.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The job store could not be read.
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- Extraction errors ---
            AppError::Extraction(err) => classify_extraction_error(err),

            // --- Store errors ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Job store error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an extraction error into an HTTP status, error code, and message.
///
/// - Bad input, selection and annotation problems map to 400.
/// - Log backend faults map to 502 with the upstream detail.
/// - A full or closed job queue maps to 503.
/// - Failing to record the job maps to 500 with a sanitized message.
fn classify_extraction_error(err: &ExtractionError) -> (StatusCode, &'static str, String) {
    match err {
        ExtractionError::InvalidPayload(_)
        | ExtractionError::MissingQuery
        | ExtractionError::InvalidQuery { .. }
        | ExtractionError::Annotation(_) => {
            (StatusCode::BAD_REQUEST, "EXTRACTION_ERROR", err.to_string())
        }
        ExtractionError::Backend(backend) => {
            if let LokiError::InvalidQuery { .. } = backend {
                return (StatusCode::BAD_REQUEST, "EXTRACTION_ERROR", err.to_string());
            }
            tracing::warn!(error = %backend, "Log backend error");
            (StatusCode::BAD_GATEWAY, "BACKEND_ERROR", err.to_string())
        }
        ExtractionError::Queue(QueueError::Full) | ExtractionError::Queue(QueueError::Closed) => {
            tracing::warn!(error = %err, "Job queue unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_UNAVAILABLE", err.to_string())
        }
        ExtractionError::Queue(QueueError::Store(store)) => {
            tracing::error!(error = %store, "Failed to record job");
            internal()
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
