//! Flat JSONL record log backend.
//!
//! Two files under the index directory: `index.jsonl` (one segment per line)
//! and `index.meta.json`. Every write lands in a `.tmp` sibling first and is
//! renamed into place, so readers see fully-old or fully-new state. The
//! wholesale-rewrite cost on change is an accepted tradeoff for small to
//! medium collections.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::error::{Result, StoreError};
use crate::store::{SegmentStore, normalize_prefix, path_in_scope};
use crate::types::{IndexMeta, Segment};

const LOG_FILE: &str = "index.jsonl";
const META_FILE: &str = "index.meta.json";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Segment log persisted as line-delimited JSON.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the log and metadata files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn read_rows(&self) -> Result<Vec<Segment>> {
        let path = self.log_path();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut rows = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            rows.push(serde_json::from_str(line)?);
        }
        Ok(rows)
    }

    async fn write_rows(&self, rows: &[Segment]) -> Result<()> {
        self.ensure_dir().await?;
        let mut out = String::new();
        for row in rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        write_atomic(&self.log_path(), out.as_bytes()).await?;
        tracing::debug!(rows = rows.len(), "segment log rewritten");
        Ok(())
    }
}

/// Write to a `.tmp` sibling, then rename into place.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl SegmentStore for LogStore {
    fn replace_document(
        &self,
        path: &str,
        segments: Vec<Segment>,
    ) -> BoxFuture<'_, Result<()>> {
        let path = path.to_owned();
        Box::pin(async move {
            let mut rows = self.read_rows().await?;
            rows.retain(|r| r.path != path);
            rows.extend(segments);
            self.write_rows(&rows).await
        })
    }

    fn append_segments(&self, segments: Vec<Segment>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if segments.is_empty() {
                return Ok(());
            }
            let mut rows = self.read_rows().await?;
            rows.extend(segments);
            self.write_rows(&rows).await
        })
    }

    fn scan_all(&self, prefix: Option<&str>) -> BoxFuture<'_, Result<Vec<Segment>>> {
        let prefix = normalize_prefix(prefix);
        Box::pin(async move {
            let mut rows = self.read_rows().await?;
            if let Some(p) = prefix {
                rows.retain(|r| path_in_scope(&r.path, &p));
            }
            Ok(rows)
        })
    }

    fn read_meta(&self) -> BoxFuture<'_, Result<IndexMeta>> {
        Box::pin(async move {
            let path = self.meta_path();
            let data = match tokio::fs::read_to_string(&path).await {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(IndexMeta::default());
                }
                Err(e) => return Err(StoreError::Io(e)),
            };
            Ok(serde_json::from_str(&data)?)
        })
    }

    fn write_meta(&self, meta: IndexMeta) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.ensure_dir().await?;
            let json = serde_json::to_vec_pretty(&meta)?;
            write_atomic(&self.meta_path(), &json).await
        })
    }
}
