use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_batch, Embedder};
use crate::error::{Error, Result, Stage};

/// Local embedding model served by Ollama (`/api/embed`).
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    client: Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaEmbedder {
    pub fn new(
        endpoint: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            Error::InvalidConfiguration(format!("failed to build Ollama HTTP client: {e}"))
        })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
            client,
        })
    }

    fn connect_error(&self, stage: Stage) -> Error {
        Error::provider(
            stage,
            format!(
                "cannot connect to Ollama at {}. Is Ollama running? Start it with `ollama serve`",
                self.endpoint
            ),
        )
    }

    async fn embed_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            truncate: true,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    self.connect_error(Stage::Embed)
                } else {
                    Error::provider(Stage::Embed, format!("Ollama request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 || body.contains("not found") {
                return Err(Error::provider(
                    Stage::Embed,
                    format!(
                        "model '{}' not found. Pull it with `ollama pull {}`",
                        self.model, self.model
                    ),
                ));
            }

            return Err(Error::provider(
                Stage::Embed,
                format!("Ollama error ({status}): {body}"),
            ));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            Error::provider(Stage::Embed, format!("invalid Ollama response: {e}"))
        })?;
        check_batch("Ollama", texts.len(), &embed_response.embeddings)?;
        Ok(embed_response.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
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

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .await
            .map_err(|_| self.connect_error(Stage::Initialize))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                Stage::Initialize,
                format!("Ollama health check failed ({})", response.status()),
            ));
        }

        let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
            Error::provider(Stage::Initialize, format!("invalid Ollama tags response: {e}"))
        })?;

        if !model_available(&tags, &self.model) {
            return Err(Error::provider(
                Stage::Initialize,
                format!(
                    "model '{}' not installed. Pull it with `ollama pull {}`",
                    self.model, self.model
                ),
            ));
        }

        Ok(())
    }
}

fn model_available(tags: &OllamaTagsResponse, model: &str) -> bool {
    tags.models
        .iter()
        .any(|m| m.name.starts_with(model) || m.name == format!("{model}:latest"))
}
