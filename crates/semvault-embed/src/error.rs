//! Error types for semvault-embed.

/// Errors from the embedding service boundary.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The request exceeded the per-call deadline.
    #[error("embedding request timed out")]
    Timeout,

    /// The service returned a different number of vectors than texts sent.
    #[error("embedding response shape mismatch: expected {expected} vectors, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The service answered with a non-success HTTP status.
    #[error("embedding request failed with status {0}")]
    Status(u16),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed response body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider failure that does not fit the other variants.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `EmbedError`.
pub type Result<T> = std::result::Result<T, EmbedError>;
