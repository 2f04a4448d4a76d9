//! Durable storage for embedded text segments.
//!
//! One storage contract ([`SegmentStore`]) with interchangeable backends: a
//! flat JSONL record log rewritten atomically on change, an in-process store
//! for tests, and an optional Qdrant-backed store behind the `qdrant` feature.

pub mod error;
pub mod log;
pub mod memory;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use log::LogStore;
pub use memory::MemoryStore;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantStore;
pub use store::{SegmentStore, normalize_prefix, path_in_scope};
pub use types::{DocumentMeta, IndexMeta, Segment};
