//! Handler for notification job status.

use alertproxy_core::types::JobId;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/status/{job_id}
///
/// Unknown ids are reported as `PENDING`, not 404.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid job id: {job_id:?}")))?;

    let status = state.store.status(id).await?;
    Ok(Json(DataResponse { data: status }))
}
