pub mod health;
pub mod status;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /webhook/grafana                     accept an alert webhook (POST)
/// /status/{job_id}                     poll a notification job (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/webhook", webhook::router())
        .nest("/status", status::router())
}
