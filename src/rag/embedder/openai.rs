//! OpenAI-compatible cloud embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_batch, Embedder};
use crate::error::{Error, Result, Stage};

pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidConfiguration("missing embedding API key".into()));
        }
        if model.trim().is_empty() {
            return Err(Error::InvalidConfiguration("missing embedding model name".into()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Error::InvalidConfiguration("invalid embedding API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::InvalidConfiguration(format!("failed to build embedding HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        })
    }

    /// Only the text-embedding-3 family accepts a requested output size.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }

    async fn embed_once(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.requested_dimensions(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::provider(Stage::Embed, format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::provider(
                Stage::Embed,
                format!("embedding request failed ({status}): {body}"),
            ));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            Error::provider(Stage::Embed, format!("invalid embedding response: {e}"))
        })?;
        let vectors = parsed.into_ordered();
        check_batch("embedding API", inputs.len(), &vectors)?;
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_once(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    /// The API may return entries out of order; `index` is authoritative.
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|entry| entry.index);
        self.data.into_iter().map(|entry| entry.embedding).collect()
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
