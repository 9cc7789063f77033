use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{similarity, CollectionSpec, Distance, ScoredPoint, StoredPoint, VectorStore};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    collections: HashMap<String, CollectionData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionData {
    dimension: usize,
    distance: Distance,
    points: HashMap<Uuid, StoredPoint>,
}

/// In-process vector index with brute-force search.
///
/// With a path, every mutation is written through to a JSON file (temp file
/// plus rename), so separate processes see each other's data on open. The
/// write happens before the change becomes visible in memory; a failed write
/// leaves the store as it was.
///
/// Each mutation rewrites the whole file synchronously on the calling task,
/// so ingestion cost grows with collection size. Large corpora belong in the
/// Qdrant backend.
pub struct EmbeddedStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl EmbeddedStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    /// Open a file-backed store, loading existing contents if the file exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read(&path)?;
            serde_json::from_slice(&content)?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self, collection: &str) -> Result<RwLockReadGuard<'_, StoreData>> {
        self.data
            .read()
            .map_err(|e| Error::unavailable(collection, e))
    }

    fn write(&self, collection: &str) -> Result<RwLockWriteGuard<'_, StoreData>> {
        self.data
            .write()
            .map_err(|e| Error::unavailable(collection, e))
    }

    /// Apply `change` under the write lock. With a file, the change is made
    /// on a copy that replaces the in-memory state only once it is on disk.
    fn commit<F>(&self, collection: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut StoreData) -> Result<()>,
    {
        let mut data = self.write(collection)?;
        let Some(path) = &self.path else {
            return change(&mut *data);
        };

        let mut next = StoreData::clone(&data);
        change(&mut next)?;
        atomic_write(path, &next).map_err(|e| Error::unavailable(collection, e))?;
        *data = next;
        Ok(())
    }
}

fn check_existing(spec: &CollectionSpec, existing: &CollectionData) -> Result<()> {
    if existing.dimension != spec.dimension || existing.distance != spec.distance {
        return Err(Error::InvalidConfiguration(format!(
            "collection '{}' exists with dimension {} ({:?}), requested {} ({:?})",
            spec.name, existing.dimension, existing.distance, spec.dimension, spec.distance
        )));
    }
    Ok(())
}

fn atomic_write(path: &Path, data: &StoreData) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec(data)?;
    fs::write(&temp_path, json)?;
    fs::rename(temp_path, path)?;

    Ok(())
}

#[async_trait]
impl VectorStore for EmbeddedStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<()> {
        {
            let data = self.read(&spec.name)?;
            if let Some(existing) = data.collections.get(&spec.name) {
                return check_existing(spec, existing);
            }
        }

        let mut created = false;
        self.commit(&spec.name, |data| {
            // Another caller may have created it since the read.
            if let Some(existing) = data.collections.get(&spec.name) {
                return check_existing(spec, existing);
            }
            data.collections.insert(
                spec.name.clone(),
                CollectionData {
                    dimension: spec.dimension,
                    distance: spec.distance,
                    points: HashMap::new(),
                },
            );
            created = true;
            Ok(())
        })?;

        if created {
            tracing::info!(
                "created collection '{}' ({} dims, {:?})",
                spec.name,
                spec.dimension,
                spec.distance
            );
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let count = points.len();
        self.commit(collection, |data| {
            let target = data
                .collections
                .get_mut(collection)
                .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

            if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
                return Err(Error::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: target.dimension,
                    actual: bad.vector.len(),
                });
            }

            for point in points {
                target.points.insert(point.id, point);
            }
            Ok(())
        })?;

        tracing::debug!("upserted {count} points into '{collection}'");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let data = self.read(collection)?;
        let target = data
            .collections
            .get(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        if query_vector.len() != target.dimension {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                expected: target.dimension,
                actual: query_vector.len(),
            });
        }

        let mut results: Vec<ScoredPoint> = target
            .points
            .values()
            .map(|point| {
                let score = similarity(target.distance, query_vector, &point.vector);
                ScoredPoint::new(point.payload.clone(), score)
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.payload.chunk_index.cmp(&b.payload.chunk_index))
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let data = self.read(collection)?;
        data.collections
            .get(collection)
            .map(|c| c.points.len())
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::rag::store::PointPayload;

    fn spec(dim: usize) -> CollectionSpec {
        CollectionSpec::new("docs", dim, Distance::Cosine)
    }

    fn point(index: usize, vector: Vec<f32>) -> StoredPoint {
        StoredPoint {
            id: Uuid::new_v4(),
            vector,
            payload: PointPayload {
                text: format!("chunk {index}"),
                chunk_index: index,
                start: index * 10,
                end: index * 10 + 10,
                page: Some(1),
            },
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(3)).await.unwrap();
        store.upsert("docs", vec![point(0, vec![1.0, 0.0, 0.0])]).await.unwrap();
        store.ensure_collection(&spec(3)).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_collection_rejects_other_dimension() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(3)).await.unwrap();
        let err = store.ensure_collection(&spec(4)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(2)).await.unwrap();
        store
            .upsert(
                "docs",
                vec![
                    point(0, vec![0.0, 1.0]),
                    point(1, vec![1.0, 0.1]),
                    point(2, vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("docs", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.chunk_index, 1);
        assert_eq!(hits[1].payload.chunk_index, 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_wrong_dimension_fails() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(3)).await.unwrap();
        store.upsert("docs", vec![point(0, vec![1.0, 0.0, 0.0])]).await.unwrap();

        for query in [vec![1.0, 0.0], vec![1.0, 0.0, 0.0, 0.0], vec![]] {
            let err = store.search("docs", &query, 5).await.unwrap_err();
            assert!(matches!(
                err,
                Error::DimensionMismatch { expected: 3, .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_upsert_wrong_dimension_fails() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(3)).await.unwrap();
        let err = store
            .upsert("docs", vec![point(0, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        assert_eq!(store.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_collection_returns_no_hits() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(2)).await.unwrap();
        assert!(store.search("docs", &[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = EmbeddedStore::in_memory();
        let err = store.search("missing", &[1.0], 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCollection);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let store = EmbeddedStore::in_memory();
        store.ensure_collection(&spec(2)).await.unwrap();
        let mut p = point(0, vec![1.0, 0.0]);
        store.upsert("docs", vec![p.clone()]).await.unwrap();
        p.payload.text = "replaced".into();
        store.upsert("docs", vec![p]).await.unwrap();

        assert_eq!(store.count("docs").await.unwrap(), 1);
        let hits = store.search("docs", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].payload.text, "replaced");
    }

    #[tokio::test]
    async fn test_persisted_store_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = EmbeddedStore::open(path.clone()).unwrap();
            store.ensure_collection(&spec(2)).await.unwrap();
            store.upsert("docs", vec![point(4, vec![0.0, 1.0])]).await.unwrap();
        }

        let reopened = EmbeddedStore::open(path.clone()).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.count("docs").await.unwrap(), 1);
        let hits = reopened.search("docs", &[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits[0].payload.chunk_index, 4);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_create_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = EmbeddedStore::open(blocker.join("store.json")).unwrap();
        let err = store.ensure_collection(&spec(2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);

        let err = store.count("docs").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCollection);
    }

    #[tokio::test]
    async fn test_failed_upsert_write_leaves_points_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let store = EmbeddedStore::open(nested.join("store.json")).unwrap();
        store.ensure_collection(&spec(2)).await.unwrap();
        store.upsert("docs", vec![point(0, vec![1.0, 0.0])]).await.unwrap();

        // Replace the directory with a file so the next write fails.
        fs::remove_dir_all(&nested).unwrap();
        fs::write(&nested, "not a directory").unwrap();

        let err = store
            .upsert("docs", vec![point(1, vec![0.0, 1.0])])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert_eq!(store.count("docs").await.unwrap(), 1);
        let hits = store.search("docs", &[0.0, 1.0], 5).await.unwrap();
        assert!(hits.iter().all(|h| h.payload.chunk_index == 0));
    }
}
