//! In-process segment store for tests and ephemeral indexes.

use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{SegmentStore, normalize_prefix, path_in_scope};
use crate::types::{IndexMeta, Segment};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Volatile backend with the same contract as the durable ones.
pub struct MemoryStore {
    rows: RwLock<Vec<Segment>>,
    meta: RwLock<IndexMeta>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            meta: RwLock::new(IndexMeta::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("lock poisoned: {e}"))
}

impl SegmentStore for MemoryStore {
    fn replace_document(
        &self,
        path: &str,
        segments: Vec<Segment>,
    ) -> BoxFuture<'_, Result<()>> {
        let path = path.to_owned();
        Box::pin(async move {
            let mut rows = self.rows.write().map_err(poisoned)?;
            rows.retain(|r| r.path != path);
            rows.extend(segments);
            Ok(())
        })
    }

    fn append_segments(&self, segments: Vec<Segment>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.rows.write().map_err(poisoned)?.extend(segments);
            Ok(())
        })
    }

    fn scan_all(&self, prefix: Option<&str>) -> BoxFuture<'_, Result<Vec<Segment>>> {
        let prefix = normalize_prefix(prefix);
        Box::pin(async move {
            let rows = self.rows.read().map_err(poisoned)?;
            Ok(match prefix {
                Some(p) => rows
                    .iter()
                    .filter(|r| path_in_scope(&r.path, &p))
                    .cloned()
                    .collect(),
                None => rows.clone(),
            })
        })
    }

    fn read_meta(&self) -> BoxFuture<'_, Result<IndexMeta>> {
        Box::pin(async move { Ok(self.meta.read().map_err(poisoned)?.clone()) })
    }

    fn write_meta(&self, meta: IndexMeta) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.meta.write().map_err(poisoned)? = meta;
            Ok(())
        })
    }
}
