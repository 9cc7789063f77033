//! Qdrant vector index over its REST API.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{CollectionSpec, Distance, PointPayload, ScoredPoint, StoredPoint, VectorStore};
use crate::config::{secret_from_env, StoreConfig};
use crate::error::{Error, Result};

pub struct QdrantStore {
    http: Client,
    base_url: String,
    ready_timeout: Duration,
    poll_interval: Duration,
    /// Declared shape of collections seen so far, for local dimension checks.
    known: RwLock<HashMap<String, (usize, Distance)>>,
}

impl QdrantStore {
    pub fn new(
        url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        ready_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                HeaderName::from_static("api-key"),
                HeaderValue::from_str(key.trim())
                    .map_err(|_| Error::InvalidConfiguration("invalid Qdrant API key".into()))?,
            );
        }

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("failed to build Qdrant HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            ready_timeout,
            poll_interval,
            known: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let api_key = config
            .api_key_env
            .as_deref()
            .map(secret_from_env)
            .transpose()?;
        Self::new(
            &config.url,
            api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
            Duration::from_millis(config.ready_timeout_ms),
            Duration::from_millis(config.ready_poll_interval_ms),
        )
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    fn remember(&self, collection: &str, dimension: usize, distance: Distance) {
        if let Ok(mut known) = self.known.write() {
            known.insert(collection.to_string(), (dimension, distance));
        }
    }

    fn remembered(&self, collection: &str) -> Option<(usize, Distance)> {
        self.known
            .read()
            .ok()
            .and_then(|known| known.get(collection).copied())
    }

    /// `Ok(None)` when the collection does not exist.
    async fn collection_info(&self, collection: &str) -> Result<Option<(usize, Distance)>> {
        let response = self
            .http
            .get(self.collection_url(collection))
            .send()
            .await
            .map_err(|e| Error::unavailable(collection, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let info: CollectionInfoResponse = response
                    .json()
                    .await
                    .map_err(|e| {
                        Error::unavailable(collection, format!("invalid collection info: {e}"))
                    })?;
                let shape = info.shape().ok_or_else(|| {
                    Error::unavailable(collection, "collection info has no single vector config")
                })?;
                self.remember(collection, shape.0, shape.1);
                Ok(Some(shape))
            }
            _ => Err(failure(collection, "collection lookup", response).await),
        }
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<()> {
        let body = json!({
            "vectors": {
                "size": spec.dimension,
                "distance": spec.distance.qdrant_name(),
            }
        });
        let response = self
            .http
            .put(self.collection_url(&spec.name))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::unavailable(&spec.name, e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                "created Qdrant collection '{}' ({} dims, {})",
                spec.name,
                spec.dimension,
                spec.distance.qdrant_name()
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || body.contains("already exists") {
            tracing::debug!("collection '{}' created concurrently", spec.name);
            return Ok(());
        }
        Err(Error::unavailable(
            &spec.name,
            format!("collection create failed ({status}): {body}"),
        ))
    }

    /// Qdrant is eventually consistent: a new collection may briefly 404.
    async fn wait_until_visible(&self, collection: &str) -> Result<()> {
        let visible = poll_until(self.poll_interval, self.ready_timeout, move || async move {
            Ok::<bool, Error>(self.collection_info(collection).await?.is_some())
        })
        .await?;

        if !visible {
            return Err(Error::unavailable(
                collection,
                format!(
                    "collection not visible after {} ms",
                    self.ready_timeout.as_millis()
                ),
            ));
        }
        Ok(())
    }

    async fn dimension_of(&self, collection: &str) -> Result<(usize, Distance)> {
        if let Some(shape) = self.remembered(collection) {
            return Ok(shape);
        }
        self.collection_info(collection)
            .await?
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))
    }
}

fn check_shape(spec: &CollectionSpec, existing: (usize, Distance)) -> Result<()> {
    if existing != (spec.dimension, spec.distance) {
        return Err(Error::InvalidConfiguration(format!(
            "collection '{}' exists with dimension {} ({}), requested {} ({})",
            spec.name,
            existing.0,
            existing.1.qdrant_name(),
            spec.dimension,
            spec.distance.qdrant_name()
        )));
    }
    Ok(())
}

async fn failure(collection: &str, action: &str, response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Error::UnknownCollection(collection.to_string());
    }
    Error::unavailable(collection, format!("{action} failed ({status}): {body}"))
}

/// Run `check` every `interval` until it reports true or `timeout` elapses.
/// Returns whether the check succeeded in time.
pub(crate) async fn poll_until<F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut check: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await? {
            return Ok(true);
        }
        if tokio::time::Instant::now() + interval > deadline {
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<()> {
        if let Some(existing) = self.collection_info(&spec.name).await? {
            return check_shape(spec, existing);
        }

        self.create_collection(spec).await?;
        self.wait_until_visible(&spec.name).await?;

        let existing = self.dimension_of(&spec.name).await?;
        check_shape(spec, existing)
    }

    async fn upsert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let (dimension, _) = self.dimension_of(collection).await?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != dimension) {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        let count = points.len();
        let body = UpsertRequest {
            points: points.iter().map(WirePoint::from).collect(),
        };
        let response = self
            .http
            .put(format!("{}/points", self.collection_url(collection)))
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::unavailable(collection, e))?;

        if !response.status().is_success() {
            return Err(failure(collection, "upsert", response).await);
        }
        tracing::debug!("upserted {count} points into Qdrant collection '{collection}'");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let (dimension, distance) = self.dimension_of(collection).await?;
        if query_vector.len() != dimension {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                expected: dimension,
                actual: query_vector.len(),
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let body = SearchRequest {
            vector: query_vector,
            limit,
            with_payload: true,
        };
        let response = self
            .http
            .post(format!("{}/points/search", self.collection_url(collection)))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::unavailable(collection, e))?;

        if !response.status().is_success() {
            return Err(failure(collection, "search", response).await);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::unavailable(collection, format!("invalid search response: {e}")))?;
        Ok(parsed.into_scored(distance))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let response = self
            .http
            .post(format!("{}/points/count", self.collection_url(collection)))
            .json(&json!({ "exact": true }))
            .send()
            .await
            .map_err(|e| Error::unavailable(collection, e))?;

        if !response.status().is_success() {
            return Err(failure(collection, "count", response).await);
        }

        let parsed: CountResponse = response
            .json()
            .await
            .map_err(|e| Error::unavailable(collection, format!("invalid count response: {e}")))?;
        Ok(parsed.result.count)
    }
}

#[derive(Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfo,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: serde_json::Value,
}

impl CollectionInfoResponse {
    /// Only unnamed single-vector collections are supported.
    fn shape(&self) -> Option<(usize, Distance)> {
        let vectors = &self.result.config.params.vectors;
        let size = vectors.get("size")?.as_u64()? as usize;
        let distance = Distance::from_qdrant_name(vectors.get("distance")?.as_str()?)?;
        Some((size, distance))
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: Vec<WirePoint<'a>>,
}

#[derive(Serialize)]
struct WirePoint<'a> {
    id: String,
    vector: &'a [f32],
    payload: &'a PointPayload,
}

impl<'a> From<&'a StoredPoint> for WirePoint<'a> {
    fn from(point: &'a StoredPoint) -> Self {
        Self {
            id: point.id.to_string(),
            vector: &point.vector,
            payload: &point.payload,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    score: f32,
    payload: Option<PointPayload>,
}

impl SearchResponse {
    /// Qdrant reports Euclid as an ascending distance; flip it so larger is
    /// always better.
    fn into_scored(self, distance: Distance) -> Vec<ScoredPoint> {
        self.result
            .into_iter()
            .filter_map(|entry| {
                let score = match distance {
                    Distance::Euclid => -entry.score,
                    _ => entry.score,
                };
                entry.payload.map(|payload| ScoredPoint::new(payload, score))
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CountResponse {
    result: CountResult,
}

#[derive(Deserialize)]
struct CountResult {
    count: usize,
}
