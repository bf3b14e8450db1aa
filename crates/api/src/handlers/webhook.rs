//! Handler for incoming alert webhooks.

use alertproxy_core::alert::AlertEvent;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::extractor::ExtractionError;
use crate::response::{DataResponse, JobAccepted};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Receive
// ---------------------------------------------------------------------------

/// POST /api/v1/webhook/grafana
///
/// Extract log context for the alert and queue a notification job.
/// Returns 202 with the job id; delivery happens in the background.
///
/// The body is read as raw bytes so that a malformed payload is reported
/// in the same `EXTRACTION_ERROR` envelope as every other input problem.
pub async fn receive_grafana(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ExtractionError::InvalidPayload(format!("body is not valid JSON: {e}")))?;
    let event = AlertEvent::from_value(value).map_err(ExtractionError::from)?;

    let job_id = state.extractor.extract(&event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobAccepted { job_id },
        }),
    ))
}
