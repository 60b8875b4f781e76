//! Feature-hashing embedder
//!
//! Bag of lowercase identifier tokens hashed into a fixed number of buckets
//! with a signed hash, then L2-normalised. No model download, fully
//! deterministic within a build. Useful offline and in tests.

use super::{EmbeddingError, EmbeddingProvider};
use ahash::RandomState;
use std::hash::BuildHasher;

const MODEL_NAME: &str = "hashing";

// Fixed seeds keep bucket assignment stable for the lifetime of the binary
const SEEDS: (u64, u64, u64, u64) = (
    0x5eed_0001_a5a5_a5a5,
    0x5eed_0002_5a5a_5a5a,
    0x5eed_0003_0f0f_0f0f,
    0x5eed_0004_f0f0_f0f0,
);

pub struct HashingEmbedder {
    dimension: usize,
    hasher: RandomState,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::InitializationError(
                "Hashing dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            hasher: RandomState::with_seeds(SEEDS.0, SEEDS.1, SEEDS.2, SEEDS.3),
        })
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let tokens = text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty());
        for token in tokens {
            let hash = self.hasher.hash_one(token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }
        Ok(self.vectorize(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}
