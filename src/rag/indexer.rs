use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::chunker::{normalize_text, Chunk, Chunker, NormalizedDocument};
use super::embedder::Embedder;
use super::store::{CollectionHandle, PointPayload, StoredPoint};
use crate::error::{Error, Result, Stage};

const UPSERT_BATCH_SIZE: usize = 64;

/// How point ids are assigned on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointIdStrategy {
    /// Fresh UUID per point; re-ingesting a document adds duplicate points.
    #[default]
    Random,
    /// UUID derived from the document content hash and chunk index;
    /// re-ingesting identical text overwrites the same points.
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub first_chunk_preview: Option<Chunk>,
}

/// Text in, stored points out: normalize, chunk, embed, upsert.
///
/// A failure at any step aborts the call. Batches already upserted stay in
/// the store; there is no rollback.
pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    collection: Arc<CollectionHandle>,
    chunker: Chunker,
    point_ids: PointIdStrategy,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        collection: Arc<CollectionHandle>,
        chunker: Chunker,
    ) -> Self {
        Self {
            embedder,
            collection,
            chunker,
            point_ids: PointIdStrategy::default(),
        }
    }

    pub fn with_point_ids(mut self, strategy: PointIdStrategy) -> Self {
        self.point_ids = strategy;
        self
    }

    /// Ingest text without page information; chunks are page-unaware.
    pub async fn ingest(&self, raw_text: &str) -> Result<IngestReport> {
        let text = normalize_text(raw_text);
        let document_id = hash_content(&text);
        let chunks = self.chunker.chunk(&text);
        self.store_chunks(&document_id, &document_id, chunks)
            .await
            .map_err(|e| e.in_document(&document_id))
    }

    /// Ingest a paged document; every chunk records the page it starts on.
    pub async fn ingest_pages<S: AsRef<str>>(
        &self,
        name: &str,
        pages: &[S],
    ) -> Result<IngestReport> {
        let doc = NormalizedDocument::from_pages(pages);
        let document_id = hash_content(&doc.text);
        let chunks = self.chunker.chunk_document(&doc);
        self.store_chunks(name, &document_id, chunks)
            .await
            .map_err(|e| e.in_document(name))
    }

    async fn store_chunks(
        &self,
        name: &str,
        document_id: &str,
        chunks: Vec<Chunk>,
    ) -> Result<IngestReport> {
        if chunks.is_empty() {
            tracing::info!("'{name}' produced no chunks, nothing stored");
            return Ok(IngestReport {
                document_id: document_id.to_string(),
                chunk_count: 0,
                first_chunk_preview: None,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::provider(
                Stage::Embed,
                format!(
                    "got {} embeddings for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            ));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.collection.dimension()) {
            return Err(Error::DimensionMismatch {
                collection: self.collection.name().to_string(),
                expected: self.collection.dimension(),
                actual: bad.len(),
            });
        }

        self.collection.ensure_ready().await?;

        let points: Vec<StoredPoint> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (chunk, vector))| StoredPoint {
                id: self.point_id(document_id, index),
                vector,
                payload: PointPayload::from_chunk(chunk, index),
            })
            .collect();

        for (i, batch) in points.chunks(UPSERT_BATCH_SIZE).enumerate() {
            if let Err(e) = self.collection.upsert(batch.to_vec()).await {
                if i > 0 {
                    tracing::warn!(
                        "'{name}' partially stored: {} of {} points written before failure",
                        i * UPSERT_BATCH_SIZE,
                        points.len()
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            "ingested '{name}': {} chunks into '{}'",
            chunks.len(),
            self.collection.name()
        );

        let chunk_count = chunks.len();
        Ok(IngestReport {
            document_id: document_id.to_string(),
            chunk_count,
            first_chunk_preview: chunks.into_iter().next(),
        })
    }

    fn point_id(&self, document_id: &str, chunk_index: usize) -> Uuid {
        match self.point_ids {
            PointIdStrategy::Random => Uuid::new_v4(),
            PointIdStrategy::Deterministic => Uuid::new_v5(
                &Uuid::NAMESPACE_OID,
                format!("{document_id}:{chunk_index}").as_bytes(),
            ),
        }
    }
}

fn hash_content(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rag::store::{CollectionSpec, Distance, EmbeddedStore, VectorStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Letter-frequency vectors: deterministic and cheap.
    struct LetterEmbedder {
        dimensions: usize,
        calls: AtomicUsize,
    }

    impl LetterEmbedder {
        fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.dimensions];
                    for b in t.bytes() {
                        v[b as usize % self.dimensions] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(Error::provider(Stage::Embed, "quota exceeded"))
        }

        fn dimensions(&self) -> usize {
            26
        }
    }

    fn setup(
        embedder: Arc<dyn Embedder>,
        dimension: usize,
    ) -> (Arc<EmbeddedStore>, IngestionPipeline) {
        let store = Arc::new(EmbeddedStore::in_memory());
        let collection = Arc::new(CollectionHandle::new(
            Arc::clone(&store) as Arc<dyn VectorStore>,
            CollectionSpec::new("docs", dimension, Distance::Cosine),
        ));
        let pipeline = IngestionPipeline::new(embedder, collection, Chunker::new(10, 2).unwrap());
        (store, pipeline)
    }

    #[tokio::test]
    async fn test_ingest_reports_chunks_and_preview() {
        let (store, pipeline) = setup(Arc::new(LetterEmbedder::new(26)), 26);
        let report = pipeline.ingest("The cat sat.\n\nThe   dog ran.").await.unwrap();

        assert_eq!(report.chunk_count, 4);
        let preview = report.first_chunk_preview.unwrap();
        assert_eq!(preview.text, "The cat sa");
        assert_eq!((preview.start, preview.end), (0, 10));
        assert_eq!(preview.page, None);
        assert_eq!(store.count("docs").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_document_never_touches_store() {
        let embedder = Arc::new(LetterEmbedder::new(26));
        let (store, pipeline) = setup(embedder.clone(), 26);
        let report = pipeline.ingest("   \n\t ").await.unwrap();

        assert_eq!(report.chunk_count, 0);
        assert!(report.first_chunk_preview.is_none());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        // collection was never created
        assert_eq!(
            store.count("docs").await.unwrap_err().kind(),
            ErrorKind::UnknownCollection
        );
    }

    #[tokio::test]
    async fn test_random_ids_duplicate_on_reingest() {
        let (store, pipeline) = setup(Arc::new(LetterEmbedder::new(26)), 26);
        pipeline.ingest("The cat sat. The dog ran.").await.unwrap();
        pipeline.ingest("The cat sat. The dog ran.").await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_deterministic_ids_make_reingest_idempotent() {
        let (store, pipeline) = setup(Arc::new(LetterEmbedder::new(26)), 26);
        let pipeline = pipeline.with_point_ids(PointIdStrategy::Deterministic);
        let first = pipeline.ingest("The cat sat. The dog ran.").await.unwrap();
        let second = pipeline.ingest("The cat sat. The dog ran.").await.unwrap();
        assert_eq!(first.document_id, second.document_id);
        assert_eq!(store.count("docs").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_provider_failure_names_document() {
        let (_, pipeline) = setup(Arc::new(FailingEmbedder), 26);
        let err = pipeline
            .ingest_pages("report.txt", &["some words here"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailure);
        assert!(err.to_string().contains("report.txt"));
    }

    #[tokio::test]
    async fn test_embedder_dimension_disagreement_is_fatal() {
        let (store, pipeline) = setup(Arc::new(LetterEmbedder::new(8)), 26);
        let err = pipeline.ingest("The cat sat.").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert!(store.count("docs").await.is_err());
    }

    #[tokio::test]
    async fn test_pages_recorded_in_payload() {
        let (store, pipeline) = setup(Arc::new(LetterEmbedder::new(26)), 26);
        let report = pipeline
            .ingest_pages("two-pages.txt", &["aaaa aaaa", "bbbb bbbb"])
            .await
            .unwrap();
        // "aaaa aaaa bbbb bbbb": starts 0, 8, 16
        assert_eq!(report.chunk_count, 3);

        let hits = store
            .search("docs", &vec![1.0; 26], 10)
            .await
            .unwrap();
        let mut pages: Vec<(usize, Option<u32>)> = hits
            .iter()
            .map(|h| (h.payload.chunk_index, h.payload.page))
            .collect();
        pages.sort();
        assert_eq!(pages, vec![(0, Some(1)), (1, Some(1)), (2, Some(2))]);
    }

    #[test]
    fn test_hash_content() {
        let h1 = hash_content("hello");
        let h2 = hash_content("hello");
        let h3 = hash_content("world");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), 16);
    }
}
