//! Composition root and the upload/ask boundary.
//!
//! `DocumentService` owns one embedder, one store and one collection handle
//! and wires them into the ingestion and retrieval pipelines. The embedder
//! and the collection readiness flag are the only shared mutable state, and
//! both initialize once behind their own guards.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::answer::{build_prompt, AnswerGenerator};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::rag::{
    create_store, Chunk, Chunker, CollectionHandle, CollectionSpec, Distance, Embedder,
    IngestionPipeline, LazyEmbedder, RetrievalPipeline, ScoredPoint, VectorStore,
};

pub const NO_CONTEXT_ANSWER: &str = "No relevant information found.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub filename: String,
    pub num_chunks: usize,
    /// Serialized as `""` when the document had no text.
    #[serde(serialize_with = "chunk_or_empty")]
    pub first_chunk_preview: Option<Chunk>,
}

fn chunk_or_empty<S: Serializer>(
    preview: &Option<Chunk>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match preview {
        Some(chunk) => chunk.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub page: Option<u32>,
    pub start: usize,
    pub end: usize,
}

impl From<&ScoredPoint> for SourceRef {
    fn from(hit: &ScoredPoint) -> Self {
        Self {
            page: hit.payload.page,
            start: hit.payload.start,
            end: hit.payload.end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskResult {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
    pub points: usize,
}

pub struct DocumentService {
    extractor: Arc<dyn TextExtractor>,
    collection: Arc<CollectionHandle>,
    ingestion: IngestionPipeline,
    retrieval: RetrievalPipeline,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl DocumentService {
    /// Wire pipelines over an existing embedder and store. The collection is
    /// declared with the embedder's dimension.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &Config,
    ) -> Result<Self> {
        config.validate()?;

        let spec = CollectionSpec::new(
            config.store.collection.clone(),
            embedder.dimensions(),
            config.store.distance,
        );
        let collection = Arc::new(CollectionHandle::new(store, spec));
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.overlap)?;

        let ingestion =
            IngestionPipeline::new(Arc::clone(&embedder), Arc::clone(&collection), chunker)
                .with_point_ids(config.ingestion.point_ids);
        let retrieval =
            RetrievalPipeline::new(embedder, Arc::clone(&collection), config.retrieval.top_k);

        Ok(Self {
            extractor: Arc::new(PlainTextExtractor),
            collection,
            ingestion,
            retrieval,
            generator: None,
        })
    }

    /// Build the configured embedder (initialized lazily) and store.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let embedder: Arc<dyn Embedder> = Arc::new(LazyEmbedder::new(config.embedder.clone()));
        let store = create_store(&config.store)?;
        Self::new(embedder, store, config)
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn collection(&self) -> &CollectionHandle {
        &self.collection
    }

    pub fn retrieval(&self) -> &RetrievalPipeline {
        &self.retrieval
    }

    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadResult> {
        let extracted = self
            .extractor
            .extract(bytes)
            .map_err(|e| e.in_document(filename))?;
        let report = self.ingestion.ingest_pages(filename, &extracted.pages).await?;

        Ok(UploadResult {
            filename: filename.to_string(),
            num_chunks: report.chunk_count,
            first_chunk_preview: report.first_chunk_preview,
        })
    }

    /// Retrieve context and answer from it. Without context the generator is
    /// not consulted.
    pub async fn ask(&self, question: &str) -> Result<AskResult> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration("no answer generator configured".into())
        })?;

        let hits = self.retrieval.retrieve_default(question).await?;
        if hits.is_empty() {
            tracing::info!("no context found for question");
            return Ok(AskResult {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let passages: Vec<&str> = hits.iter().map(|h| h.payload.text.as_str()).collect();
        let prompt = build_prompt(question, &passages);
        let answer = generator.generate(&prompt).await?;

        Ok(AskResult {
            answer,
            sources: hits.iter().map(SourceRef::from).collect(),
        })
    }

    pub async fn status(&self) -> Result<CollectionStatus> {
        let points = self.collection.count().await?;
        let spec = self.collection.spec();
        Ok(CollectionStatus {
            name: spec.name.clone(),
            dimension: spec.dimension,
            distance: spec.distance,
            points,
        })
    }
}
