use std::sync::Arc;

use super::embedder::Embedder;
use super::store::{CollectionHandle, ScoredPoint};
use crate::error::Result;

/// Question in, most similar stored chunks out.
pub struct RetrievalPipeline {
    embedder: Arc<dyn Embedder>,
    collection: Arc<CollectionHandle>,
    default_k: usize,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        collection: Arc<CollectionHandle>,
        default_k: usize,
    ) -> Self {
        Self {
            embedder,
            collection,
            default_k,
        }
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Up to `k` hits by descending similarity. An empty or never-created
    /// collection yields an empty list; callers must treat that as "no
    /// context" rather than answer without it.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<ScoredPoint>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(question).await?;
        // Creates the collection when nothing was ingested yet.
        self.collection.ensure_ready().await?;
        let hits = self.collection.search(&query_vector, k).await?;

        tracing::debug!(
            "retrieved {} of top-{k} hits from '{}'",
            hits.len(),
            self.collection.name()
        );
        Ok(hits)
    }

    pub async fn retrieve_default(&self, question: &str) -> Result<Vec<ScoredPoint>> {
        self.retrieve(question, self.default_k).await
    }
}
