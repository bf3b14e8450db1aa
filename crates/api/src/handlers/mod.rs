//! Request handlers.
//!
//! Handlers stay thin: they decode the request, delegate to the
//! [`ContextExtractor`](crate::extractor::ContextExtractor) or the job store,
//! and map errors via [`AppError`](crate::error::AppError).

pub mod status;
pub mod webhook;
