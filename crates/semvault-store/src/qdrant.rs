//! Qdrant-backed segment store for large collections.
//!
//! Segments live as points in a cosine-distance collection; the index
//! metadata document stays in a sidecar `index.meta.json` next to the
//! configured index directory, so change detection works identically across
//! backends.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
    PointStruct, ScrollPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, value::Kind,
};

use crate::error::{Result, StoreError};
use crate::log::write_atomic;
use crate::store::{SegmentStore, normalize_prefix, path_in_scope};
use crate::types::{IndexMeta, Segment};

const META_FILE: &str = "index.meta.json";
const SCROLL_PAGE: u32 = 256;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Segment store delegating vector persistence to a Qdrant collection.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    meta_dir: PathBuf,
}

impl std::fmt::Debug for QdrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl QdrantStore {
    /// Connect to Qdrant at `url`. `meta_dir` holds the sidecar metadata file.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str, collection: impl Into<String>, meta_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Qdrant::from_url(url).build().map_err(Box::new)?;
        Ok(Self {
            client,
            collection: collection.into(),
            meta_dir: meta_dir.into(),
        })
    }

    /// Create the collection with cosine distance if it doesn't exist.
    async fn ensure_collection(&self, vector_size: u64) -> Result<()> {
        if self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(());
        }
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
            )
            .await
            .map_err(Box::new)?;
        Ok(())
    }

    async fn upsert(&self, segments: Vec<Segment>) -> Result<()> {
        let Some(first) = segments.first() else {
            return Ok(());
        };
        let vector_size = u64::try_from(first.embedding.len())
            .map_err(|e| StoreError::Backend(format!("vector size exceeds u64: {e}")))?;
        self.ensure_collection(vector_size).await?;

        let mut points = Vec::with_capacity(segments.len());
        for seg in segments {
            let payload: std::collections::HashMap<String, qdrant_client::qdrant::Value> =
                serde_json::from_value(serde_json::json!({
                    "id": seg.id,
                    "path": seg.path,
                    "content": seg.content,
                    "start": seg.start,
                    "end": seg.end,
                    "section": seg.section,
                }))?;
            points.push(PointStruct::new(
                uuid::Uuid::new_v4().to_string(),
                seg.embedding,
                payload,
            ));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(Box::new)?;
        tracing::debug!(points = count, collection = %self.collection, "upserted segments");
        Ok(())
    }

    async fn delete_path(&self, path: &str) -> Result<()> {
        if !self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(());
        }
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(Filter::must(vec![Condition::matches(
                        "path",
                        path.to_string(),
                    )]))
                    .wait(true),
            )
            .await
            .map_err(Box::new)?;
        tracing::debug!(path, collection = %self.collection, "deleted segments for path");
        Ok(())
    }

    async fn scroll_segments(&self, prefix: Option<String>) -> Result<Vec<Segment>> {
        if !self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(Box::new)?
        {
            return Ok(Vec::new());
        }

        let mut segments = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.collection)
                .with_payload(true)
                .with_vectors(true)
                .limit(SCROLL_PAGE);
            if let Some(ref off) = offset {
                builder = builder.offset(off.clone());
            }

            let response = self.client.scroll(builder).await.map_err(Box::new)?;

            for point in &response.result {
                let Some(embedding) = point.vectors.as_ref().and_then(|v| {
                    match v.vectors_options.as_ref()? {
                        VectorsOptions::Vector(v) => Some(v.data.clone()),
                        VectorsOptions::Vectors(_) => None,
                    }
                }) else {
                    continue;
                };
                let Some(seg) = segment_from_payload(&point.payload, embedding) else {
                    continue;
                };
                if let Some(ref p) = prefix
                    && !path_in_scope(&seg.path, p)
                {
                    continue;
                }
                segments.push(seg);
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(segments)
    }

    fn meta_path(&self) -> PathBuf {
        self.meta_dir.join(META_FILE)
    }
}

fn segment_from_payload(
    payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    embedding: Vec<f32>,
) -> Option<Segment> {
    let get_str = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    };
    let get_usize = |key: &str| match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => usize::try_from(*i).ok(),
        _ => None,
    };

    Some(Segment {
        id: get_str("id")?,
        path: get_str("path")?,
        content: get_str("content")?,
        embedding,
        start: get_usize("start")?,
        end: get_usize("end")?,
        section: get_str("section"),
    })
}

impl SegmentStore for QdrantStore {
    fn replace_document(
        &self,
        path: &str,
        segments: Vec<Segment>,
    ) -> BoxFuture<'_, Result<()>> {
        let path = path.to_owned();
        Box::pin(async move {
            self.delete_path(&path).await?;
            self.upsert(segments).await
        })
    }

    fn append_segments(&self, segments: Vec<Segment>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.upsert(segments).await })
    }

    fn scan_all(&self, prefix: Option<&str>) -> BoxFuture<'_, Result<Vec<Segment>>> {
        let prefix = normalize_prefix(prefix);
        Box::pin(async move { self.scroll_segments(prefix).await })
    }

    fn read_meta(&self) -> BoxFuture<'_, Result<IndexMeta>> {
        Box::pin(async move {
            let data = match tokio::fs::read_to_string(self.meta_path()).await {
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
            tokio::fs::create_dir_all(&self.meta_dir).await?;
            let json = serde_json::to_vec_pretty(&meta)?;
            write_atomic(&self.meta_path(), &json).await
        })
    }
}
