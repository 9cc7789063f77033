use std::sync::Arc;

use tokio::sync::OnceCell;

use super::{CollectionSpec, ScoredPoint, StoredPoint, VectorStore};
use crate::error::{Error, Result};

/// A collection of one store, with its readiness remembered.
///
/// The first `ensure_ready` performs the store round-trip; concurrent callers
/// wait for that attempt instead of issuing their own, and later calls return
/// immediately. A failed attempt is not remembered, so the next caller tries
/// again. Upserts and searches go through `ensure_ready` first and therefore
/// never reach a collection that is still being created.
pub struct CollectionHandle {
    store: Arc<dyn VectorStore>,
    spec: CollectionSpec,
    ready: OnceCell<()>,
}

impl CollectionHandle {
    pub fn new(store: Arc<dyn VectorStore>, spec: CollectionSpec) -> Self {
        Self {
            store,
            spec,
            ready: OnceCell::new(),
        }
    }

    pub fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn dimension(&self) -> usize {
        self.spec.dimension
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    pub async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| self.store.ensure_collection(&self.spec))
            .await?;
        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.spec.dimension {
            return Err(Error::DimensionMismatch {
                collection: self.spec.name.clone(),
                expected: self.spec.dimension,
                actual,
            });
        }
        Ok(())
    }

    pub async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()> {
        if let Some(bad) = points.iter().find(|p| p.vector.len() != self.spec.dimension) {
            return self.check_dimension(bad.vector.len());
        }
        self.ensure_ready().await?;
        self.store.upsert(&self.spec.name, points).await
    }

    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        self.check_dimension(query_vector.len())?;
        self.ensure_ready().await?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.search(&self.spec.name, query_vector, limit).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.ensure_ready().await?;
        self.store.count(&self.spec.name).await
    }
}
