#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid duration: {0:?}. Use e.g. 30s, 5m, 1h, 2d")]
    InvalidDuration(String),

    #[error("Invalid annotation {key}: {message}")]
    InvalidAnnotation { key: &'static str, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
