//! Log Query Client for a Loki-compatible log backend.
//!
//! - [`LogBackend`] is the seam the extractor depends on.
//! - [`LokiClient`] implements it over the Loki HTTP API.
//! - [`response`] normalizes multi-stream results into one ordered list.

pub mod api;
pub mod backend;
pub mod error;
pub mod response;

pub use api::{LokiClient, LokiConfig};
pub use backend::{LogBackend, RangeQuery};
pub use error::LokiError;
