use crate::config::Config;
use crate::error::{RepoChatError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_ingest(config, &mut errors);
        Self::validate_chunking(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_llm(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RepoChatError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_ingest(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.ingest.allowed_hosts.is_empty() {
            errors.push(ValidationError::new(
                "ingest.allowed_hosts",
                "At least one repository host must be allowed",
            ));
        }

        if config.ingest.allowed_hosts.iter().any(|h| h.trim().is_empty()) {
            errors.push(ValidationError::new(
                "ingest.allowed_hosts",
                "Host names cannot be empty",
            ));
        }

        if config.ingest.max_file_bytes == 0 {
            errors.push(ValidationError::new(
                "ingest.max_file_bytes",
                "Maximum file size must be greater than 0",
            ));
        }
    }

    fn validate_chunking(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.chunking.chunk_size == 0 {
            errors.push(ValidationError::new(
                "chunking.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.model == crate::embedding::HASHING_MODEL
            && config.embedding.hashing_dimension == 0
        {
            errors.push(ValidationError::new(
                "embedding.hashing_dimension",
                "Hashing dimension must be greater than 0",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let llm = &config.llm;

        if llm.model.trim().is_empty() {
            errors.push(ValidationError::new("llm.model", "Model name cannot be empty"));
        }

        match url::Url::parse(&llm.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "llm.base_url",
                format!("Expected an http(s) URL, got '{}'", llm.base_url),
            )),
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        if !(0.0..=1.0).contains(&llm.top_p) {
            errors.push(ValidationError::new(
                "llm.top_p",
                format!("top_p must be between 0.0 and 1.0, got {}", llm.top_p),
            ));
        }

        if llm.repeat_penalty <= 0.0 {
            errors.push(ValidationError::new(
                "llm.repeat_penalty",
                "Repeat penalty must be positive",
            ));
        }

        // Ollama uses -1 for "no limit"
        if llm.num_predict == 0 || llm.num_predict < -1 {
            errors.push(ValidationError::new(
                "llm.num_predict",
                format!("num_predict must be -1 or positive, got {}", llm.num_predict),
            ));
        }

        if llm.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "llm.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }
}
