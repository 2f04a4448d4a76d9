//! Test-only deterministic embedder.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Embedder;
use crate::error::{EmbedError, Result};

/// Embedding dimension used by the mock.
pub const MOCK_DIM: usize = 8;

/// Deterministic in-process embedder.
///
/// Identical texts always produce identical vectors, which makes incremental
/// builds reproducible in tests. Specific texts can be pinned to chosen
/// vectors for ranking assertions.
#[derive(Debug, Default)]
pub struct MockEmbedder {
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    texts_embedded: AtomicUsize,
    fail: bool,
    /// Milliseconds to sleep before answering.
    delay_ms: u64,
}

impl MockEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An embedder whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep for `ms` before answering each call.
    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Pin `text` to a fixed vector instead of the derived one.
    #[must_use]
    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned
            .lock()
            .expect("mock lock poisoned")
            .insert(text.to_owned(), vector);
        self
    }

    /// Number of `embed` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Total number of texts embedded so far.
    #[must_use]
    pub fn texts_embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }
}

/// Fold text bytes into a small normalized vector.
fn derive_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; MOCK_DIM];
    for (i, b) in text.bytes().enumerate() {
        v[i % MOCK_DIM] += f32::from(b) / 255.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        v[0] = 1.0;
    } else {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail {
            return Err(EmbedError::Other("mock embed error".into()));
        }
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        let pinned = self.pinned.lock().expect("mock lock poisoned");
        Ok(texts
            .iter()
            .map(|t| pinned.get(t).cloned().unwrap_or_else(|| derive_vector(t)))
            .collect())
    }
}
