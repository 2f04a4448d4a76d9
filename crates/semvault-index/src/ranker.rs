//! Multi-query similarity search with MMR diversification.
//!
//! Every query variant is embedded and scored against all in-scope segments
//! by cosine similarity; candidates merge by segment id keeping the best
//! score, then a Maximal-Marginal-Relevance pass picks the final results.
//! Inter-candidate similarity uses token-set Jaccard overlap, so the
//! diversification is lexical: near-duplicate chunks cannot crowd the list
//! even when their embeddings agree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use semvault_embed::Embedder;
use semvault_store::{Segment, SegmentStore, normalize_prefix};
use tracing::debug;

use crate::error::{IndexError, Result};

/// Hard cap on returned results, regardless of the requested `k`.
pub const MAX_RESULTS: usize = 5;

/// Character budget for result snippets.
pub const SNIPPET_CHARS: usize = 1200;

/// Tunable search parameters.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Relevance/diversity tradeoff for MMR; 1.0 is pure relevance.
    pub mmr_lambda: f32,
    /// Segments shorter than this are score-penalized as low-information.
    pub min_chunk_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mmr_lambda: 0.5,
            min_chunk_chars: 160,
        }
    }
}

/// What the query text is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Free-text query.
    ByQuery(String),
    /// Use the named document's own indexed text as the query. Falls back
    /// to the identifier itself when the document has no segments.
    ByDocument(String),
}

/// One search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub mode: SearchMode,
    /// Extra query variants from upstream expansion; fanned out and merged.
    pub queries: Vec<String>,
    /// Requested result count, clamped to [`MAX_RESULTS`].
    pub k: Option<usize>,
    /// Optional path-prefix scope. Empty, `/`, and `.` mean no filter.
    pub filter: Option<String>,
}

impl SearchRequest {
    #[must_use]
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            mode: SearchMode::ByQuery(text.into()),
            queries: Vec::new(),
            k: None,
            filter: None,
        }
    }

    #[must_use]
    pub fn document(path: impl Into<String>) -> Self {
        Self {
            mode: SearchMode::ByDocument(path.into()),
            queries: Vec::new(),
            k: None,
            filter: None,
        }
    }
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub path: String,
    pub section: Option<String>,
    pub score: f32,
    /// Chunk content truncated to [`SNIPPET_CHARS`].
    pub snippet: String,
}

/// Read-only retrieval over a segment store.
pub struct Ranker<E> {
    store: Arc<dyn SegmentStore>,
    embedder: E,
    config: SearchConfig,
}

impl<E: Embedder> Ranker<E> {
    pub fn new(store: Arc<dyn SegmentStore>, embedder: E, config: SearchConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run one search.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidRequest`] when no usable query text can
    /// be derived, or any embedding/store error encountered.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let base = match &request.mode {
            SearchMode::ByQuery(q) => q.trim().to_owned(),
            SearchMode::ByDocument(path) => self.document_query(path).await?,
        };

        let mut queries: Vec<String> = Vec::new();
        if !base.is_empty() {
            queries.push(base);
        }
        for extra in &request.queries {
            let extra = extra.trim();
            if !extra.is_empty() && !queries.iter().any(|q| q == extra) {
                queries.push(extra.to_owned());
            }
        }
        if queries.is_empty() {
            return Err(IndexError::InvalidRequest("empty query".into()));
        }

        let prefix = normalize_prefix(request.filter.as_deref());
        let segments = self.store.scan_all(prefix.as_deref()).await?;
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self.embedder.embed(&queries).await?;
        let k = request.k.unwrap_or(MAX_RESULTS).min(MAX_RESULTS);

        // Fan-out: best score per segment across all query variants.
        let mut best: HashMap<&str, f32> = HashMap::new();
        for vector in &vectors {
            for segment in &segments {
                let mut score = cosine(vector, &segment.embedding);
                if segment.content.chars().count() < self.config.min_chunk_chars {
                    score *= 0.6;
                }
                let entry = best.entry(segment.id.as_str()).or_insert(f32::MIN);
                if score > *entry {
                    *entry = score;
                }
            }
        }

        let mut candidates: Vec<(&Segment, f32)> = segments
            .iter()
            .map(|s| (s, best[s.id.as_str()]))
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        debug!(
            queries = queries.len(),
            segments = segments.len(),
            k,
            "search scored"
        );

        Ok(mmr_select(&candidates, k, self.config.mmr_lambda)
            .into_iter()
            .map(|(segment, score)| SearchHit {
                id: segment.id.clone(),
                path: segment.path.clone(),
                section: segment.section.clone(),
                score,
                snippet: segment.content.chars().take(SNIPPET_CHARS).collect(),
            })
            .collect())
    }

    /// Query text for by-document mode: the document's indexed content.
    async fn document_query(&self, path: &str) -> Result<String> {
        let mut segments = self.store.scan_all(Some(path)).await?;
        segments.retain(|s| s.path == path);
        if segments.is_empty() {
            return Ok(path.to_owned());
        }
        segments.sort_by_key(|s| s.start);
        Ok(segments
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl<E> std::fmt::Debug for Ranker<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Render hits as a context block for downstream prompt assembly.
#[must_use]
pub fn format_context(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for hit in hits {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        match &hit.section {
            Some(section) => out.push_str(&format!("[{} — {section}]\n", hit.path)),
            None => out.push_str(&format!("[{}]\n", hit.path)),
        }
        out.push_str(&hit.snippet);
    }
    out
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Greedy MMR: each round picks the candidate maximizing
/// `λ·relevance − (1−λ)·max_jaccard_to_selected`.
fn mmr_select<'a>(
    candidates: &[(&'a Segment, f32)],
    k: usize,
    lambda: f32,
) -> Vec<(&'a Segment, f32)> {
    let mut selected: Vec<(&Segment, f32)> = Vec::new();
    let mut selected_tokens: Vec<HashSet<String>> = Vec::new();
    let mut remaining: Vec<(&Segment, f32, HashSet<String>)> = candidates
        .iter()
        .map(|(s, score)| (*s, *score, tokens(&s.content)))
        .collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_objective = f32::MIN;
        for (idx, (_, score, toks)) in remaining.iter().enumerate() {
            let redundancy = selected_tokens
                .iter()
                .map(|chosen| jaccard(toks, chosen))
                .fold(0.0f32, f32::max);
            let objective = lambda * score - (1.0 - lambda) * redundancy;
            if objective > best_objective {
                best_objective = objective;
                best_idx = idx;
            }
        }
        let (segment, score, toks) = remaining.swap_remove(best_idx);
        selected.push((segment, score));
        selected_tokens.push(toks);
    }
    selected
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let intersection = a.intersection(b).count() as f32;
    #[allow(clippy::cast_precision_loss)]
    let union = a.union(b).count() as f32;
    intersection / union
}
