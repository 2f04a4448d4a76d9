//! Error types for semvault-store.

/// Errors that can occur during segment store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error reading or writing store files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Qdrant vector database error.
    #[cfg(feature = "qdrant")]
    #[error("Qdrant error: {0}")]
    Qdrant(#[from] Box<qdrant_client::QdrantError>),

    /// Backend-specific failure that does not fit the other variants.
    #[error("{0}")]
    Backend(String),
}

/// Result type alias using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
