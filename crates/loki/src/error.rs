/// Errors from the log backend. Never retried here; retry policy belongs to the caller.
#[derive(Debug, thiserror::Error)]
pub enum LokiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Loki request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Loki returned a non-2xx status code.
    #[error("Loki API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    /// Loki rejected the query syntax.
    #[error("Loki rejected the query ({status}): {message}")]
    InvalidQuery { status: u16, message: String },

    /// The result set is not line-oriented (e.g. a metric query).
    #[error("Unexpected Loki result type {0:?}, expected \"streams\"")]
    UnexpectedResultType(String),

    /// The body could not be decoded into the expected shape.
    #[error("Failed to decode Loki response: {0}")]
    Decode(String),
}
