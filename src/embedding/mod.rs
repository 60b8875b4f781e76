mod batch;
mod hashing;
/// Local embedding generation
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - HashingEmbedder for model-free, deterministic embedding
/// - BatchProcessor to embed a chunked corpus ahead of indexing
mod provider;

pub use batch::{BatchProcessor, BatchResult};
pub use hashing::HashingEmbedder;
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

use crate::config::EmbeddingConfig;
use std::sync::Arc;

/// Model name selecting [`HashingEmbedder`]
pub const HASHING_MODEL: &str = "hashing";

/// Construct the provider named by the configuration.
///
/// This is the expensive step of startup; call it once and share the result.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    if config.model == HASHING_MODEL {
        tracing::info!("Using hashing embedder ({}D)", config.hashing_dimension);
        return Ok(Arc::new(HashingEmbedder::new(config.hashing_dimension)?));
    }
    Ok(Arc::new(FastEmbedProvider::new(&config.model)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_from_config() {
        let config = EmbeddingConfig {
            model: HASHING_MODEL.to_string(),
            batch_size: 8,
            hashing_dimension: 48,
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.dimension(), 48);
        assert_eq!(provider.model_name(), "hashing");
    }
}
