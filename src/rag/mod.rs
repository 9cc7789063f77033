pub mod chunker;
pub mod embedder;
pub mod indexer;
pub mod searcher;
pub mod store;

pub use chunker::{chunk, normalize_text, Chunk, Chunker, NormalizedDocument};
pub use embedder::{create_embedder, Embedder, EmbedderConfig, EmbedderProvider, LazyEmbedder};
pub use indexer::{IngestReport, IngestionPipeline, PointIdStrategy};
pub use searcher::RetrievalPipeline;
pub use store::{
    create_store, CollectionHandle, CollectionSpec, Distance, EmbeddedStore, PointPayload,
    QdrantStore, ScoredPoint, StoredPoint, VectorStore,
};
