//! TOML configuration.
//!
//! Every section has defaults, so an empty or missing file yields a working
//! setup against a local Ollama server and an embedded store:
//!
//! ```toml
//! [chunking]
//! chunk_size = 500
//! overlap = 50
//!
//! [embedder]
//! provider = "ollama"
//! model = "all-minilm"
//! dimensions = 384
//!
//! [store]
//! backend = "qdrant"
//! url = "http://localhost:6333"
//!
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! docqa = "debug"
//! ```
//!
//! Secrets never live in the file; sections name the environment variable
//! holding them (`api_key_env`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::answer::GeneratorConfig;
use crate::error::{Error, Result};
use crate::rag::embedder::EmbedderConfig;
use crate::rag::indexer::PointIdStrategy;
use crate::rag::store::Distance;

pub const DEFAULT_CONFIG_FILE: &str = "docqa.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub embedder: EmbedderConfig,
    pub store: StoreConfig,
    pub ingestion: IngestionConfig,
    pub retrieval: RetrievalConfig,
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Embedded,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub collection: String,
    pub distance: Distance,
    /// Persistence file for the embedded backend. `None` keeps points in memory only.
    pub path: Option<PathBuf>,
    pub url: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Upper bound on waiting for a freshly created collection to become visible.
    pub ready_timeout_ms: u64,
    pub ready_poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Embedded,
            collection: "document_chunks".to_string(),
            distance: Distance::Cosine,
            path: Some(PathBuf::from(".docqa").join("store.json")),
            url: "http://localhost:6333".to_string(),
            api_key_env: None,
            timeout_secs: 30,
            ready_timeout_ms: 10_000,
            ready_poll_interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub point_ids: PointIdStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter applied to every target without an override.
    pub default: String,
    /// Per-target overrides, e.g. `docqa::rag = "debug"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: "warn".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `path`, or from `docqa.toml` in the working directory.
    ///
    /// An explicit path must exist. Without one, a missing `docqa.toml`
    /// means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path, true),
            None => Self::load_file(Path::new(DEFAULT_CONFIG_FILE), false),
        }
    }

    fn load_file(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() {
            if required {
                return Err(Error::InvalidConfiguration(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            tracing::debug!("no config at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::InvalidConfiguration(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ChunkingConfig {
            chunk_size,
            overlap,
        } = self.chunking;
        if chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunking.chunk_size must be greater than 0".into(),
            ));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "chunking.overlap ({overlap}) must be smaller than chunking.chunk_size ({chunk_size})"
            )));
        }
        if self.embedder.dimensions == 0 {
            return Err(Error::InvalidConfiguration(
                "embedder.dimensions must be greater than 0".into(),
            ));
        }
        if self.embedder.batch_size == 0 {
            return Err(Error::InvalidConfiguration(
                "embedder.batch_size must be greater than 0".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfiguration(
                "retrieval.top_k must be greater than 0".into(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "store.collection must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Read a secret from the environment variable `name`.
pub fn secret_from_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(Error::InvalidConfiguration(format!(
            "environment variable {name} is not set"
        ))),
    }
}
