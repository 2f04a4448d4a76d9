//! Batched text embedding for semvault.
//!
//! The [`Embedder`] trait turns a slice of texts into one vector per text,
//! same order, same count. The concrete client speaks the Ollama `/api/embed`
//! wire contract; a deterministic mock behind the `mock` feature serves the
//! test suites of downstream crates.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{BATCH_SIZE, OllamaEmbedder};
pub use error::{EmbedError, Result};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;

/// Batch embedding provider.
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch times out, the service answers with a
    /// non-success status, or the response vector count does not match the
    /// input count.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

impl<E: Embedder> Embedder for std::sync::Arc<E> {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send {
        E::embed(self, texts)
    }
}
