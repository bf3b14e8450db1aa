use axum::routing::get;
use axum::Router;

use crate::handlers::status;
use crate::state::AppState;

/// Routes mounted at `/status`.
///
/// ```text
/// GET    /{job_id}         -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{job_id}", get(status::get_status))
}
