//! Alert proxy API server library.
//!
//! Exposes the building blocks (config, state, extractor, error handling,
//! routes, background tasks) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod extractor;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
