//! Error types for semvault-index.

/// Errors that can occur during index builds and searches.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source documents.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding service error — fatal to the batch it belongs to.
    #[error("embedding error: {0}")]
    Embed(#[from] semvault_embed::EmbedError),

    /// Segment store error.
    #[error("store error: {0}")]
    Store(#[from] semvault_store::StoreError),

    /// A build is already running; overlapping builds would corrupt the
    /// wholesale-rewrite storage strategy.
    #[error("an index build is already in progress")]
    BuildInProgress,

    /// Malformed search or source input.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
