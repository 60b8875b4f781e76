//! Configuration management for repochat
//!
//! Loads the TOML configuration file, applies `REPOCHAT_SECTION__KEY`
//! environment overrides and named profiles, then validates the result.

use crate::error::{RepoChatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Prefix for environment overrides
const ENV_PREFIX: &str = "REPOCHAT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub ingest: IngestConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Repository fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Hosts a repository URL may point at
    pub allowed_hosts: Vec<String>,
    /// Commits fetched per clone; 0 fetches full history
    pub clone_depth: u32,
    /// Files larger than this are left out of the corpus
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in characters
    pub chunk_size: usize,
}

impl ChunkingConfig {
    pub fn size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.chunk_size).ok_or_else(|| RepoChatError::InvalidConfigValue {
            path: "chunking.chunk_size".to_string(),
            message: "Chunk size must be greater than 0".to_string(),
        })
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// fastembed model name, or "hashing" for the model-free embedder
    pub model: String,
    pub batch_size: usize,
    /// Only used by the hashing embedder
    pub hashing_dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Upper bound on prompt length in characters, 0 for unlimited
    pub max_chars: usize,
    /// Most recent turns carried into the prompt
    pub max_history_turns: usize,
}

/// LLM configuration (local Ollama runtime)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub num_predict: i32,
    /// Pull a missing model instead of failing
    pub auto_pull: bool,
    /// Seconds to wait for the first fragment
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Indexed repositories kept in memory, 0 for unbounded
    pub max_repositories: usize,
}

impl CacheConfig {
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.max_repositories)
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RepoChatError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_profile(profile)?;
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RepoChatError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RepoChatError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| RepoChatError::Config(format!("Unknown profile: {profile}")))?;

        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
        if let Some(temperature) = overrides.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(model) = overrides.embedding_model {
            self.embedding.model = model;
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.chunking.chunk_size = chunk_size;
        }
        tracing::debug!("Applied profile: {}", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: REPOCHAT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "INGEST__CLONE_DEPTH" => self.ingest.clone_depth = parse_env(path, value)?,
            "INGEST__MAX_FILE_BYTES" => self.ingest.max_file_bytes = parse_env(path, value)?,
            "LLM__BASE_URL" => self.llm.base_url = value.to_string(),
            "LLM__MODEL" => self.llm.model = value.to_string(),
            "LLM__TEMPERATURE" => self.llm.temperature = parse_env(path, value)?,
            "LLM__AUTO_PULL" => self.llm.auto_pull = parse_env(path, value)?,
            "LLM__TIMEOUT_SECS" => self.llm.timeout_secs = parse_env(path, value)?,
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__BATCH_SIZE" => self.embedding.batch_size = parse_env(path, value)?,
            "CHUNKING__CHUNK_SIZE" => self.chunking.chunk_size = parse_env(path, value)?,
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_env(path, value)?,
            "PROMPT__MAX_CHARS" => self.prompt.max_chars = parse_env(path, value)?,
            "CACHE__MAX_REPOSITORIES" => self.cache.max_repositories = parse_env(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RepoChatError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("repochat").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RepoChatError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            ingest: IngestConfig {
                allowed_hosts: vec!["github.com".to_string()],
                clone_depth: 1,
                max_file_bytes: 1_048_576,
            },
            chunking: ChunkingConfig { chunk_size: 600 },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
                hashing_dimension: 384,
            },
            retrieval: RetrievalConfig { top_k: 5 },
            prompt: PromptConfig {
                max_chars: 12_000,
                max_history_turns: 6,
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
                temperature: 0.7,
                top_p: 0.9,
                repeat_penalty: 1.15,
                num_predict: 256,
                auto_pull: false,
                timeout_secs: 120,
            },
            cache: CacheConfig {
                max_repositories: 0,
            },
            profiles: HashMap::new(),
        }
    }
}
