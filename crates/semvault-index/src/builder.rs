//! Change-aware index builds.
//!
//! A build scans the source, fingerprints each document's text with blake3,
//! and re-chunks and re-embeds only documents whose fingerprint differs from
//! the last committed metadata. Documents that vanished from the source are
//! purged from the store. Metadata commits only after every write succeeded,
//! so a failed build retries from the last good state.

use std::sync::Arc;
use std::time::Instant;

use semvault_embed::{BATCH_SIZE, Embedder};
use semvault_store::{DocumentMeta, IndexMeta, Segment, SegmentStore, path_in_scope};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chunker::{self, ChunkerConfig};
use crate::error::{IndexError, Result};
use crate::progress::{Phase, Progress, ProgressFn};
use crate::source::TextSource;

/// Build-time options.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Path prefixes to index; empty means everything.
    pub include: Vec<String>,
    /// Path prefixes to skip; always wins over `include`.
    pub exclude: Vec<String>,
    pub chunker: ChunkerConfig,
}

/// Summary of one completed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub documents_scanned: usize,
    /// Stale documents that were re-chunked and re-embedded.
    pub documents_indexed: usize,
    pub documents_unchanged: usize,
    pub documents_removed: usize,
    /// Documents the source produced no text for.
    pub documents_skipped: usize,
    pub chunks_embedded: usize,
    pub duration_ms: u64,
}

/// Orchestrates scan, embed, and commit for one document collection.
pub struct IndexBuilder<E> {
    source: Arc<dyn TextSource>,
    store: Arc<dyn SegmentStore>,
    embedder: E,
    config: BuildConfig,
    // Overlapping builds would corrupt the wholesale-rewrite store strategy.
    build_lock: Mutex<()>,
}

impl<E: Embedder> IndexBuilder<E> {
    pub fn new(
        source: Arc<dyn TextSource>,
        store: Arc<dyn SegmentStore>,
        embedder: E,
        config: BuildConfig,
    ) -> Self {
        Self {
            source,
            store,
            embedder,
            config,
            build_lock: Mutex::new(()),
        }
    }

    /// Content fingerprint used for change detection.
    #[must_use]
    pub fn fingerprint(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    fn in_scope(&self, path: &str) -> bool {
        if self
            .config
            .exclude
            .iter()
            .any(|p| path_in_scope(path, p.trim_matches('/')))
        {
            return false;
        }
        self.config.include.is_empty()
            || self
                .config
                .include
                .iter()
                .any(|p| path_in_scope(path, p.trim_matches('/')))
    }

    /// Run one build. Rejects overlap with an already-running build.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::BuildInProgress`] when a build is already
    /// running, or the first source, embedding, or store error encountered.
    /// On error the previously committed metadata is left untouched.
    pub async fn build(&self, progress: Option<&ProgressFn>) -> Result<BuildReport> {
        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(IndexError::BuildInProgress);
        };
        let started = Instant::now();
        let mut report = BuildReport::default();

        let old_meta = self.store.read_meta().await?;
        let docs: Vec<String> = self
            .source
            .list_documents()
            .await?
            .into_iter()
            .filter(|p| self.in_scope(p))
            .collect();
        report.documents_scanned = docs.len();

        // Scan phase: fingerprint everything, partition unchanged vs stale.
        let mut new_meta = IndexMeta::now();
        let mut stale: Vec<(String, String, String)> = Vec::new();
        for path in &docs {
            let Some(text) = self.source.get_text(path).await? else {
                // Extraction unavailable; keep whatever we had for it.
                debug!(path, "no text extracted, skipping");
                report.documents_skipped += 1;
                if let Some(prior) = old_meta.documents.get(path) {
                    new_meta.documents.insert(path.clone(), prior.clone());
                }
                continue;
            };
            let hash = Self::fingerprint(&text);
            match old_meta.documents.get(path) {
                Some(prior) if prior.hash == hash => {
                    report.documents_unchanged += 1;
                    new_meta.documents.insert(path.clone(), prior.clone());
                }
                _ => stale.push((path.clone(), hash, text)),
            }
        }

        let chunked: Vec<(String, String, Vec<chunker::Chunk>)> = stale
            .iter()
            .map(|(path, hash, text)| {
                (
                    path.clone(),
                    hash.clone(),
                    chunker::chunk_text(text, &self.config.chunker),
                )
            })
            .collect();
        let total_chunks: usize = chunked.iter().map(|(_, _, c)| c.len()).sum();
        report_progress(progress, 0, total_chunks, Phase::Scan, None);
        info!(
            scanned = report.documents_scanned,
            stale = stale.len(),
            unchanged = report.documents_unchanged,
            total_chunks,
            "scan complete"
        );

        // Embed phase: one document at a time, one progress update per
        // batch. A failure here aborts before any metadata commit.
        let mut processed = 0usize;
        for (path, hash, chunks) in chunked {
            if chunks.is_empty() {
                // Nothing embeddable; drop any prior segments, record no
                // metadata so the document is retried if it gains content.
                self.store.replace_document(&path, Vec::new()).await?;
                report.documents_indexed += 1;
                continue;
            }
            // Batches within one document stay sequential so vector order
            // always lines up with chunk order.
            let mut segments = Vec::with_capacity(chunks.len());
            for batch in chunks.chunks(BATCH_SIZE) {
                let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
                let vectors = self.embedder.embed(&texts).await?;
                segments.extend(batch.iter().zip(vectors).map(|(chunk, embedding)| Segment {
                    id: Segment::make_id(&path, chunk.start, chunk.end),
                    path: path.clone(),
                    content: chunk.content.clone(),
                    embedding,
                    start: chunk.start,
                    end: chunk.end,
                    section: chunker::infer_section(&path, &chunk.content),
                }));
                processed += batch.len();
                report.chunks_embedded += batch.len();
                report_progress(
                    progress,
                    processed,
                    total_chunks,
                    Phase::Embed,
                    Some(path.clone()),
                );
            }
            let chunk_count = segments.len();
            self.store.replace_document(&path, segments).await?;
            report.documents_indexed += 1;
            new_meta
                .documents
                .insert(path.clone(), DocumentMeta { hash, chunk_count });
        }

        // Documents gone from the source lose their segments and metadata.
        for path in old_meta.documents.keys() {
            if !new_meta.documents.contains_key(path) && !docs.contains(path) {
                warn!(path, "document removed from source, purging");
                self.store.replace_document(path, Vec::new()).await?;
                report.documents_removed += 1;
            }
        }

        self.store.write_meta(new_meta).await?;
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        report_progress(progress, processed, total_chunks, Phase::Done, None);
        info!(
            indexed = report.documents_indexed,
            removed = report.documents_removed,
            chunks = report.chunks_embedded,
            duration_ms = report.duration_ms,
            "build committed"
        );
        Ok(report)
    }
}

impl<E> std::fmt::Debug for IndexBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn report_progress(
    progress: Option<&ProgressFn>,
    processed: usize,
    total: usize,
    phase: Phase,
    note: Option<String>,
) {
    if let Some(cb) = progress {
        cb(Progress {
            processed,
            total,
            phase,
            note,
        });
    }
}
