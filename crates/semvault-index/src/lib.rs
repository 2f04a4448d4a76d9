//! Change-aware incremental indexing and semantic retrieval.
//!
//! Documents flow from a [`source::TextSource`] through the paragraph and
//! sentence aware [`chunker`], get embedded in batches, and land in a
//! [`semvault_store::SegmentStore`]. Only documents whose fingerprint changed
//! since the last committed build are re-embedded. The [`ranker`] answers
//! multi-query similarity searches with MMR-diversified results.

pub mod builder;
pub mod chunker;
pub mod error;
pub mod progress;
pub mod ranker;
pub mod source;

pub use builder::{BuildConfig, BuildReport, IndexBuilder};
pub use error::{IndexError, Result};
pub use progress::{Phase, Progress, ProgressFn};
pub use ranker::{
    MAX_RESULTS, Ranker, SNIPPET_CHARS, SearchConfig, SearchHit, SearchMode, SearchRequest,
    format_context,
};
pub use source::{FsSource, MemorySource, TextSource};
