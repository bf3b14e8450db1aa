use std::sync::Arc;

use alertproxy_db::JobStore;

use crate::config::ServerConfig;
use crate::extractor::ContextExtractor;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (everything is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Turns webhooks into queued notification jobs.
    pub extractor: Arc<ContextExtractor>,
    /// Job status store, polled by the status endpoint.
    pub store: Arc<dyn JobStore>,
}
