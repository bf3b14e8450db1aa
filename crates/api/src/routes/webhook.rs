//! Route definitions for alert webhooks.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes mounted at `/webhook`.
///
/// ```text
/// POST   /grafana          -> receive_grafana
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/grafana", post(webhook::receive_grafana))
}
