//! Record types shared by every store backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One embedded, retrievable chunk of document text.
///
/// Segments are never mutated in place: a content change replaces every
/// segment of the owning document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable identifier derived from `(path, start, end)`.
    pub id: String,
    /// Source document identifier.
    pub path: String,
    /// Exact chunk text the embedding was produced from.
    pub content: String,
    /// Fixed-dimension embedding vector.
    pub embedding: Vec<f32>,
    /// First chunking unit covered by this segment.
    pub start: usize,
    /// Last chunking unit covered by this segment.
    pub end: usize,
    /// Advisory human-readable label (heading, slide number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl Segment {
    /// Canonical segment id for a `(path, start, end)` triple.
    #[must_use]
    pub fn make_id(path: &str, start: usize, end: usize) -> String {
        format!("{path}#{start}-{end}")
    }
}

/// Per-document bookkeeping: fingerprint of the last indexed content and how
/// many segments it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub hash: String,
    pub chunk_count: usize,
}

/// Index-wide metadata, the source of truth for change detection.
///
/// Rewritten wholesale at the end of every successful build; a document has
/// an entry here if and only if its segments are present in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Unix epoch milliseconds of the last committed build.
    #[serde(default)]
    pub created_at: u64,
    /// Document path -> bookkeeping entry.
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentMeta>,
}

impl IndexMeta {
    /// Empty metadata stamped with the current wall clock.
    #[must_use]
    pub fn now() -> Self {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            created_at,
            documents: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_id_encodes_path_and_range() {
        assert_eq!(Segment::make_id("notes/a.md", 0, 3), "notes/a.md#0-3");
    }

    #[test]
    fn segment_roundtrips_through_json() {
        let seg = Segment {
            id: Segment::make_id("a.md", 1, 2),
            path: "a.md".into(),
            content: "hello".into(),
            embedding: vec![0.1, 0.2],
            start: 1,
            end: 2,
            section: Some("Intro".into()),
        };
        let json = serde_json::to_string(&seg).unwrap();
        let back: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn section_omitted_when_none() {
        let seg = Segment {
            id: "a.md#0-0".into(),
            path: "a.md".into(),
            content: "x".into(),
            embedding: vec![],
            start: 0,
            end: 0,
            section: None,
        };
        let json = serde_json::to_string(&seg).unwrap();
        assert!(!json.contains("section"));
    }

    #[test]
    fn meta_default_is_empty() {
        let meta = IndexMeta::default();
        assert_eq!(meta.created_at, 0);
        assert!(meta.documents.is_empty());
    }

    #[test]
    fn meta_roundtrips_through_json() {
        let mut meta = IndexMeta {
            created_at: 42,
            documents: BTreeMap::new(),
        };
        meta.documents.insert(
            "a.md".into(),
            DocumentMeta {
                hash: "abc".into(),
                chunk_count: 3,
            },
        );
        let json = serde_json::to_string(&meta).unwrap();
        let back: IndexMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
