use std::fmt;

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initialize,
    Embed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Initialize => write!(f, "initialize"),
            Stage::Embed => write!(f, "embed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dimension mismatch in collection '{collection}': expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("Vector store unavailable for collection '{collection}': {message}")]
    StoreUnavailable { collection: String, message: String },

    #[error("Embedding provider failed during {stage}: {message}")]
    ProviderFailure { stage: Stage, message: String },

    #[error("Collection '{0}' does not exist")]
    UnknownCollection(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Ingestion of '{document}' failed: {source}")]
    Ingest {
        document: String,
        #[source]
        source: Box<Error>,
    },
}

/// Flat classification of [`Error`], looking through context wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidConfiguration,
    DimensionMismatch,
    StoreUnavailable,
    ProviderFailure,
    UnknownCollection,
    Extraction,
    Generation,
    Io,
    Serialization,
}

impl Error {
    pub fn provider(stage: Stage, message: impl fmt::Display) -> Self {
        Error::ProviderFailure {
            stage,
            message: message.to_string(),
        }
    }

    pub fn unavailable(collection: &str, message: impl fmt::Display) -> Self {
        Error::StoreUnavailable {
            collection: collection.to_string(),
            message: message.to_string(),
        }
    }

    /// Attach the document being ingested.
    pub fn in_document(self, document: &str) -> Self {
        Error::Ingest {
            document: document.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Ingest { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Error::ProviderFailure { .. } => ErrorKind::ProviderFailure,
            Error::UnknownCollection(_) => ErrorKind::UnknownCollection,
            Error::Extraction(_) => ErrorKind::Extraction,
            Error::Generation(_) => ErrorKind::Generation,
            Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Ingest { source, .. } => source.kind(),
        }
    }

    /// Only an unreachable store is worth retrying, and only at the boundary.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreUnavailable
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
