use crate::embedding::EmbeddingError;
use crate::generation::GenerationError;
use crate::index::VectorIndexError;
use crate::ingest::IngestError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for repochat
#[derive(Error, Debug)]
pub enum RepoChatError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Repository could not be fetched or produced no text
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestError),

    /// Vector index could not be built
    #[error("Vector index error: {0}")]
    IndexBuild(#[from] VectorIndexError),

    /// A query reached an index holding no chunks
    #[error("Index holds no chunks")]
    EmptyIndex,

    /// Embedding provider failures
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Model runtime unreachable or model not present
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(#[from] GenerationError),

    /// Rejected before retrieval
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query against a repository that was never loaded
    #[error("Repository not loaded: {key}")]
    RepositoryNotLoaded { key: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification surfaced to the interactive layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Ingestion,
    IndexBuild,
    EmptyIndex,
    GenerationUnavailable,
    InvalidQuery,
    NotLoaded,
    Config,
    Internal,
}

impl RepoChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ingestion(_) => ErrorKind::Ingestion,
            Self::IndexBuild(_) | Self::Embedding(_) => ErrorKind::IndexBuild,
            Self::EmptyIndex => ErrorKind::EmptyIndex,
            Self::GenerationUnavailable(_) => ErrorKind::GenerationUnavailable,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::RepositoryNotLoaded { .. } => ErrorKind::NotLoaded,
            Self::Config(_)
            | Self::ConfigValidation { .. }
            | Self::ConfigNotFound { .. }
            | Self::InvalidConfigValue { .. }
            | Self::Toml(_)
            | Self::TomlSerialization(_) => ErrorKind::Config,
            Self::Io { .. } | Self::Json { .. } | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Suggestion shown next to the error message, if any
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Ingestion(_) => Some("check that the repository URL is public and reachable".into()),
            Self::IndexBuild(_) | Self::EmptyIndex => {
                Some("the repository has no extractable text; check the URL".into())
            }
            Self::GenerationUnavailable(GenerationError::ModelMissing { model }) => {
                Some(format!("run `ollama pull {model}` and try again"))
            }
            Self::GenerationUnavailable(_) => {
                Some("make sure Ollama is running (`ollama serve`)".into())
            }
            Self::RepositoryNotLoaded { .. } => Some("load a repository first".into()),
            Self::Config(_) | Self::ConfigValidation { .. } | Self::ConfigNotFound { .. } => {
                Some("run `repochat config init` to create a default configuration".into())
            }
            _ => None,
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for repochat operations
pub type Result<T> = std::result::Result<T, RepoChatError>;
