//! End-to-end builds and searches over real store backends.

use std::sync::Arc;
use std::time::Duration;

use semvault_embed::MockEmbedder;
use semvault_index::{
    BuildConfig, IndexBuilder, IndexError, MemorySource, Ranker, SearchConfig, SearchRequest,
    TextSource,
};
use semvault_store::{LogStore, MemoryStore, SegmentStore};

fn fixture_source() -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::new());
    source.put(
        "notes/apples.md",
        "# Apples\n\nApples are crisp autumn fruit. They store well in cellars.",
    );
    source.put(
        "notes/oranges.md",
        "# Oranges\n\nOranges are citrus fruit. They need warm climates to thrive.",
    );
    source.put(
        "recipes/pie.md",
        "# Pie\n\nA pie needs a filling and a crust. Bake until golden brown.",
    );
    source
}

fn build_parts(
    source: Arc<MemorySource>,
    store: Arc<dyn SegmentStore>,
) -> (IndexBuilder<Arc<MockEmbedder>>, Arc<MockEmbedder>) {
    let embedder = Arc::new(MockEmbedder::new());
    let builder = IndexBuilder::new(
        source,
        store,
        Arc::clone(&embedder),
        BuildConfig::default(),
    );
    (builder, embedder)
}

#[tokio::test]
async fn rebuild_without_changes_embeds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SegmentStore> = Arc::new(LogStore::new(dir.path()));
    let (builder, embedder) = build_parts(fixture_source(), Arc::clone(&store));

    let first = builder.build(None).await.unwrap();
    assert_eq!(first.documents_indexed, 3);
    let embedded_after_first = embedder.texts_embedded();
    let segments_after_first = store.scan_all(None).await.unwrap();

    let second = builder.build(None).await.unwrap();
    assert_eq!(second.documents_indexed, 0);
    assert_eq!(second.documents_unchanged, 3);
    assert_eq!(embedder.texts_embedded(), embedded_after_first);
    assert_eq!(store.scan_all(None).await.unwrap(), segments_after_first);
}

#[tokio::test]
async fn changing_one_document_leaves_others_untouched() {
    let source = fixture_source();
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());
    let (builder, _) = build_parts(Arc::clone(&source), Arc::clone(&store));

    builder.build(None).await.unwrap();
    let before: Vec<_> = store
        .scan_all(Some("notes/oranges.md"))
        .await
        .unwrap();

    source.put(
        "notes/apples.md",
        "# Apples\n\nCompletely rewritten apple lore.",
    );
    let report = builder.build(None).await.unwrap();
    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.documents_unchanged, 2);

    let after: Vec<_> = store
        .scan_all(Some("notes/oranges.md"))
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn log_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn SegmentStore> = Arc::new(LogStore::new(dir.path()));
        let (builder, _) = build_parts(fixture_source(), store);
        builder.build(None).await.unwrap();
    }

    let reopened = LogStore::new(dir.path());
    let segments = reopened.scan_all(None).await.unwrap();
    assert_eq!(segments.len(), 3);
    let meta = reopened.read_meta().await.unwrap();
    assert_eq!(meta.documents.len(), 3);
}

#[tokio::test]
async fn removed_document_gone_after_rebuild() {
    let source = fixture_source();
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SegmentStore> = Arc::new(LogStore::new(dir.path()));
    let (builder, _) = build_parts(Arc::clone(&source), Arc::clone(&store));

    builder.build(None).await.unwrap();
    source.remove("recipes/pie.md");
    let report = builder.build(None).await.unwrap();

    assert_eq!(report.documents_removed, 1);
    let segments = store.scan_all(None).await.unwrap();
    assert!(segments.iter().all(|s| !s.path.starts_with("recipes/")));
    assert!(
        !store
            .read_meta()
            .await
            .unwrap()
            .documents
            .contains_key("recipes/pie.md")
    );
}

#[tokio::test]
async fn failed_build_recovers_on_next_run() {
    let source = fixture_source();
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());

    let failing = IndexBuilder::new(
        Arc::clone(&source) as Arc<dyn TextSource>,
        Arc::clone(&store),
        MockEmbedder::failing(),
        BuildConfig::default(),
    );
    failing.build(None).await.unwrap_err();
    assert!(store.read_meta().await.unwrap().documents.is_empty());

    // Next run starts from the last good (empty) state and indexes all.
    let (builder, _) = build_parts(source, Arc::clone(&store));
    let report = builder.build(None).await.unwrap();
    assert_eq!(report.documents_indexed, 3);
}

#[tokio::test]
async fn overlapping_builds_rejected() {
    let source = fixture_source();
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());
    let builder = Arc::new(IndexBuilder::new(
        source as Arc<dyn TextSource>,
        store,
        MockEmbedder::new().with_delay(200),
        BuildConfig::default(),
    ));

    let background = Arc::clone(&builder);
    let first = tokio::spawn(async move { background.build(None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = builder.build(None).await.unwrap_err();
    assert!(matches!(err, IndexError::BuildInProgress));

    first.await.unwrap().unwrap();
    // The lock is free again once the first build finished.
    builder.build(None).await.unwrap();
}

#[tokio::test]
async fn search_finds_the_matching_document() {
    let source = fixture_source();
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());
    let (builder, embedder) = build_parts(source, Arc::clone(&store));
    builder.build(None).await.unwrap();

    let ranker = Ranker::new(store, embedder, SearchConfig::default());
    // The mock derives identical vectors for identical text, so querying
    // with a chunk's own text must rank that chunk first.
    let query = "# Apples\nApples are crisp autumn fruit. They store well in cellars.";
    let hits = ranker.search(&SearchRequest::query(query)).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].path, "notes/apples.md");
    assert_eq!(hits[0].section.as_deref(), Some("Apples"));
}

#[tokio::test]
async fn search_cap_holds_over_large_store() {
    let source = Arc::new(MemorySource::new());
    for i in 0..20 {
        source.put(
            format!("doc{i}.md"),
            format!("Document number {i} talks about topic {i} at length."),
        );
    }
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());
    let (builder, embedder) = build_parts(source, Arc::clone(&store));
    builder.build(None).await.unwrap();

    let ranker = Ranker::new(store, embedder, SearchConfig::default());
    let mut request = SearchRequest::query("topic");
    request.k = Some(50);
    let hits = ranker.search(&request).await.unwrap();
    assert_eq!(hits.len(), 5);
}

#[tokio::test]
async fn search_filter_restricts_to_prefix() {
    let source = fixture_source();
    let store: Arc<dyn SegmentStore> = Arc::new(MemoryStore::new());
    let (builder, embedder) = build_parts(source, Arc::clone(&store));
    builder.build(None).await.unwrap();

    let ranker = Ranker::new(store, embedder, SearchConfig::default());
    let mut request = SearchRequest::query("fruit");
    request.filter = Some("recipes".into());
    let hits = ranker.search(&request).await.unwrap();
    assert!(hits.iter().all(|h| h.path.starts_with("recipes/")));
}
