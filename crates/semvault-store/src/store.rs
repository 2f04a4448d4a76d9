//! The storage contract every backend implements.

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::types::{IndexMeta, Segment};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability contract for segment storage.
///
/// Backends must make `write_meta` and the segment writes effectively atomic:
/// a concurrent reader observes either the fully-old or fully-new state.
/// Replacing a document with an empty segment list removes it.
pub trait SegmentStore: Send + Sync {
    /// Drop all segments for `path` and insert `segments` in their place.
    fn replace_document(
        &self,
        path: &str,
        segments: Vec<Segment>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Append new segments without touching existing ones.
    fn append_segments(&self, segments: Vec<Segment>) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Read every stored segment, optionally restricted to a path prefix.
    ///
    /// The prefix is matched as a folder: `path == prefix` or
    /// `path` starting with `prefix + "/"`.
    fn scan_all(&self, prefix: Option<&str>) -> BoxFuture<'_, Result<Vec<Segment>, StoreError>>;

    /// Read the index metadata document. A missing document yields the default.
    fn read_meta(&self) -> BoxFuture<'_, Result<IndexMeta, StoreError>>;

    /// Atomically replace the index metadata document.
    fn write_meta(&self, meta: IndexMeta) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Normalize a folder filter: empty, root, or dot filters mean "no filter";
/// leading and trailing slashes are stripped.
#[must_use]
pub fn normalize_prefix(prefix: Option<&str>) -> Option<String> {
    let p = prefix?.trim();
    if p.is_empty() || p == "/" || p == "." {
        return None;
    }
    let p = p.trim_matches('/');
    if p.is_empty() { None } else { Some(p.to_owned()) }
}

/// Whether `path` falls under a normalized folder prefix.
#[must_use]
pub fn path_in_scope(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_empty_and_root_to_none() {
        assert_eq!(normalize_prefix(None), None);
        assert_eq!(normalize_prefix(Some("")), None);
        assert_eq!(normalize_prefix(Some("   ")), None);
        assert_eq!(normalize_prefix(Some("/")), None);
        assert_eq!(normalize_prefix(Some(".")), None);
        assert_eq!(normalize_prefix(Some("///")), None);
    }

    #[test]
    fn normalize_strips_slashes() {
        assert_eq!(normalize_prefix(Some("/notes/")), Some("notes".into()));
        assert_eq!(
            normalize_prefix(Some("notes/daily")),
            Some("notes/daily".into())
        );
    }

    #[test]
    fn scope_matches_folder_boundary() {
        assert!(path_in_scope("notes/a.md", "notes"));
        assert!(path_in_scope("notes", "notes"));
        assert!(!path_in_scope("notes-archive/a.md", "notes"));
        assert!(!path_in_scope("other/a.md", "notes"));
    }
}
