mod lazy;
mod ollama;
mod openai;

pub use lazy::LazyEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::secret_from_env;
use crate::error::{Error, Result, Stage};

/// Maps texts to fixed-dimension vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider(Stage::Embed, "no embedding returned"))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
    /// Local model served by Ollama.
    Ollama,
    /// Any OpenAI-compatible `/embeddings` API.
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub provider: EmbedderProvider,
    pub model: String,
    pub endpoint: Option<String>,
    pub dimensions: usize,
    /// Environment variable holding the API key (cloud providers only).
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::Ollama,
            model: "all-minilm".to_string(),
            endpoint: None,
            dimensions: 384,
            api_key_env: None,
            timeout_secs: 120,
            batch_size: 32,
        }
    }
}

/// Build the configured provider. Fails with `InvalidConfiguration` when a
/// required credential is missing.
pub fn create_embedder(config: &EmbedderConfig) -> Result<Box<dyn Embedder>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider {
        EmbedderProvider::Ollama => {
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string());
            Ok(Box::new(OllamaEmbedder::new(
                &endpoint,
                &config.model,
                config.dimensions,
                timeout,
                config.batch_size,
            )?))
        }
        EmbedderProvider::OpenAi => {
            let key_env = config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let api_key = secret_from_env(key_env)?;
            let endpoint = config
                .endpoint
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            Ok(Box::new(OpenAiEmbedder::new(
                &api_key,
                &endpoint,
                &config.model,
                config.dimensions,
                timeout,
                config.batch_size,
            )?))
        }
    }
}

/// Check a provider response against the request.
pub(crate) fn check_batch(provider: &str, inputs: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != inputs {
        return Err(Error::provider(
            Stage::Embed,
            format!(
                "{provider} returned {} embeddings for {inputs} inputs",
                vectors.len()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_embed_single_uses_batch() {
        let v = Fixed.embed("abc").await.unwrap();
        assert_eq!(v, vec![3.0, 1.0]);
    }

    #[test]
    fn test_check_batch_rejects_short_response() {
        let err = check_batch("test", 2, &[vec![1.0]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailure);
        assert!(check_batch("test", 1, &[vec![1.0]]).is_ok());
    }

    #[test]
    fn test_openai_without_key_is_configuration_error() {
        let config = EmbedderConfig {
            provider: EmbedderProvider::OpenAi,
            api_key_env: Some("DOCQA_TEST_UNSET_EMBED_KEY".to_string()),
            ..Default::default()
        };
        let err = create_embedder(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_default_ollama_embedder_builds() {
        let embedder = create_embedder(&EmbedderConfig::default()).unwrap();
        assert_eq!(embedder.dimensions(), 384);
    }
}
