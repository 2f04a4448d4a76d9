mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use semvault_embed::OllamaEmbedder;
use semvault_index::{
    BuildConfig, FsSource, IndexBuilder, Phase, Progress, Ranker, SearchConfig, SearchRequest,
    format_context,
};
use semvault_index::chunker::ChunkerConfig;
use semvault_store::{LogStore, SegmentStore};

use config::Config;

#[derive(Parser)]
#[command(name = "semvault", version, about = "Semantic index for plain-text note collections")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "semvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build or refresh the index for a document tree.
    Index {
        /// Root directory of the document collection.
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Query the index and print ranked snippets.
    Search {
        query: String,
        /// Requested result count (capped server-side).
        #[arg(short)]
        k: Option<usize>,
        /// Restrict results to a path prefix.
        #[arg(long)]
        filter: Option<String>,
        /// Treat QUERY as a document path and find related material.
        #[arg(long)]
        document: bool,
    },
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SegmentStore>> {
    tracing::debug!(backend = %config.store.backend, dir = %config.index.dir, "opening segment store");
    match config.store.backend.as_str() {
        "log" => Ok(Arc::new(LogStore::new(&config.index.dir))),
        #[cfg(feature = "qdrant")]
        "qdrant" => Ok(Arc::new(semvault_store::QdrantStore::new(
            &config.store.qdrant_url,
            config.store.qdrant_collection.clone(),
            &config.index.dir,
        )?)),
        other => bail!("unknown store backend: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let store = open_store(&config)?;
    let embedder = OllamaEmbedder::new(&config.embedding.host, config.embedding.model.clone());

    match cli.command {
        Command::Index { root } => {
            let source = Arc::new(
                FsSource::new(root).with_extensions(config.index.extensions.clone()),
            );
            let builder = IndexBuilder::new(
                source,
                store,
                embedder,
                BuildConfig {
                    include: config.index.include.clone(),
                    exclude: config.index.exclude.clone(),
                    chunker: ChunkerConfig {
                        chunk_size: config.index.chunk_size_chars,
                        chunk_overlap: config.index.chunk_overlap_chars,
                    },
                },
            );
            let progress = |p: Progress| {
                if p.phase == Phase::Embed {
                    let note = p.note.unwrap_or_default();
                    eprintln!("embedded {}/{} chunks ({note})", p.processed, p.total);
                }
            };
            let report = builder.build(Some(&progress)).await?;
            println!(
                "indexed {} document(s), {} unchanged, {} removed, {} chunk(s) embedded in {} ms",
                report.documents_indexed,
                report.documents_unchanged,
                report.documents_removed,
                report.chunks_embedded,
                report.duration_ms,
            );
        }
        Command::Search {
            query,
            k,
            filter,
            document,
        } => {
            let ranker = Ranker::new(
                store,
                embedder,
                SearchConfig {
                    mmr_lambda: config.search.mmr_lambda,
                    min_chunk_chars: config.search.min_chunk_chars,
                },
            );
            let mut request = if document {
                SearchRequest::document(query)
            } else {
                SearchRequest::query(query)
            };
            request.k = k;
            request.filter = filter;

            let hits = ranker.search(&request).await?;
            tracing::info!(hits = hits.len(), "search complete");
            if hits.is_empty() {
                println!("no results");
            } else {
                for hit in &hits {
                    println!("{:.3}  {}", hit.score, hit.id);
                }
                println!("\n{}", format_context(&hits));
            }
        }
    }
    Ok(())
}
