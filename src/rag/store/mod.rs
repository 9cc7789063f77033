mod collection;
mod embedded;
mod qdrant;
mod types;

pub use collection::CollectionHandle;
pub use embedded::EmbeddedStore;
pub use qdrant::QdrantStore;
pub use types::{CollectionSpec, Distance, PointPayload, ScoredPoint, StoredPoint};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;

/// A vector index holding named collections of points.
///
/// Implementations surface transport failures as `StoreUnavailable` and
/// never retry on their own.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist. Idempotent.
    ///
    /// An existing collection declared with a different dimension is an
    /// `InvalidConfiguration` error.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<()>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()>;

    /// Up to `limit` hits ordered by descending score. A query whose length
    /// differs from the collection dimension is a `DimensionMismatch`.
    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;

    async fn count(&self, collection: &str) -> Result<usize>;
}

pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    match config.backend {
        StoreBackend::Embedded => {
            let store = match &config.path {
                Some(path) => EmbeddedStore::open(path.clone())?,
                None => EmbeddedStore::in_memory(),
            };
            Ok(Arc::new(store))
        }
        StoreBackend::Qdrant => Ok(Arc::new(QdrantStore::from_config(config)?)),
    }
}

/// Score `b` against `a`; larger is more similar for every metric.
pub fn similarity(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => {
            let squared: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
            -squared.sqrt()
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
