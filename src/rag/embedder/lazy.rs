use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::{create_embedder, Embedder, EmbedderConfig};
use crate::error::{Error, Result, Stage};

type Factory = Box<dyn Fn() -> Result<Arc<dyn Embedder>> + Send + Sync>;

enum InitFailure {
    Configuration(String),
    Provider(String),
}

impl InitFailure {
    fn message(&self) -> &str {
        match self {
            InitFailure::Configuration(msg) | InitFailure::Provider(msg) => msg,
        }
    }
}

/// Builds the provider on first use and shares it afterwards.
///
/// Construction and the provider health check run at most once, even with
/// many concurrent first callers. A failed initialization is remembered:
/// every later call reports the same error without trying again.
pub struct LazyEmbedder {
    dimensions: usize,
    factory: Factory,
    handle: OnceCell<std::result::Result<Arc<dyn Embedder>, InitFailure>>,
}

impl LazyEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        let dimensions = config.dimensions;
        Self::with_factory(dimensions, move || {
            create_embedder(&config).map(Arc::from)
        })
    }

    /// `dimensions` is the size the provider is expected to produce; a
    /// provider reporting anything else fails initialization.
    pub fn with_factory<F>(dimensions: usize, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>> + Send + Sync + 'static,
    {
        Self {
            dimensions,
            factory: Box::new(factory),
            handle: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.handle.get(), Some(Ok(_)))
    }

    async fn initialize(&self) -> std::result::Result<Arc<dyn Embedder>, InitFailure> {
        tracing::debug!("initializing embedding provider");
        let embedder = (self.factory)().map_err(|e| InitFailure::Configuration(e.to_string()))?;
        if embedder.dimensions() != self.dimensions {
            return Err(InitFailure::Configuration(format!(
                "provider produces {}-dimensional vectors, expected {}",
                embedder.dimensions(),
                self.dimensions
            )));
        }
        embedder
            .health_check()
            .await
            .map_err(|e| InitFailure::Provider(e.to_string()))?;
        tracing::info!("embedding provider ready ({} dimensions)", self.dimensions);
        Ok(embedder)
    }

    async fn provider(&self) -> Result<&Arc<dyn Embedder>> {
        let state = self
            .handle
            .get_or_init(|| async {
                let result = self.initialize().await;
                if let Err(failure) = &result {
                    tracing::warn!("embedding provider unavailable: {}", failure.message());
                }
                result
            })
            .await;

        match state {
            Ok(embedder) => Ok(embedder),
            Err(InitFailure::Configuration(msg)) => Err(Error::InvalidConfiguration(format!(
                "embedder initialization failed: {msg}"
            ))),
            Err(InitFailure::Provider(msg)) => Err(Error::provider(
                Stage::Initialize,
                format!("embedder initialization failed: {msg}"),
            )),
        }
    }
}

#[async_trait]
impl Embedder for LazyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.provider().await?.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<()> {
        self.provider().await.map(|_| ())
    }
}
