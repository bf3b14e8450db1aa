//! Shared response envelope types for API handlers.
//!
//! Successful API responses use a `{ "data": ... }` envelope. Errors use
//! `{ "error": ..., "code": ... }` (see [`crate::error::AppError`]).

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body of an accepted webhook.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: alertproxy_core::types::JobId,
}
