/// Batch embedding of chunks ahead of index construction
use super::{EmbeddingError, EmbeddingProvider};
use crate::chunking::Chunk;
use std::sync::Arc;
use tracing::{debug, info};

/// Output of a batch run: every chunk paired with its vector, in input order
#[derive(Debug)]
pub struct BatchResult {
    pub pairs: Vec<(Chunk, Vec<f32>)>,
    pub batches: usize,
    pub duration_ms: u64,
}

/// Embeds chunks in fixed-size batches
///
/// Any failing batch aborts the whole run; a partially embedded corpus is
/// never handed to the index.
pub struct BatchProcessor {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl BatchProcessor {
    /// Create a new batch processor
    ///
    /// # Arguments
    /// * `provider` - Embedding provider
    /// * `batch_size` - Number of chunks to embed in one call (0 is treated as 1)
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every chunk, preserving order
    pub fn process(&self, chunks: Vec<Chunk>) -> Result<BatchResult, EmbeddingError> {
        let start = std::time::Instant::now();
        let total = chunks.len();

        info!("Embedding {} chunks with {}", total, self.provider.model_name());

        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(total);
        let mut batches = 0;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.provider.embed_batch(&texts)?;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }

            vectors.extend(embeddings);
            batches += 1;
            debug!("Embedded batch {} ({} chunks)", batches, batch.len());
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Embedding complete: {} chunks in {} batches, {}ms",
            total, batches, duration_ms
        );

        Ok(BatchResult {
            pairs: chunks.into_iter().zip(vectors).collect(),
            batches,
            duration_ms,
        })
    }

    /// Run [`Self::process`] on the blocking pool
    pub async fn process_blocking(
        self: Arc<Self>,
        chunks: Vec<Chunk>,
    ) -> Result<BatchResult, EmbeddingError> {
        tokio::task::spawn_blocking(move || self.process(chunks))
            .await
            .map_err(|e| EmbeddingError::GenerationError(format!("Embedding task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    /// Returns one vector fewer than asked for
    struct ShortProvider;

    impl EmbeddingProvider for ShortProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![0.0])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(vec![vec![0.0]; texts.len().saturating_sub(1)])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| Chunk::new(format!("chunk number {i}"), i * 20, None))
            .collect()
    }

    #[test]
    fn test_batches_preserve_order() {
        let provider = Arc::new(HashingEmbedder::new(16).unwrap());
        let processor = BatchProcessor::new(provider.clone(), 4);

        let result = processor.process(chunks(10)).unwrap();

        assert_eq!(result.batches, 3);
        assert_eq!(result.pairs.len(), 10);
        for (i, (chunk, vector)) in result.pairs.iter().enumerate() {
            assert_eq!(chunk.offset, i * 20);
            assert_eq!(vector, &provider.embed(&chunk.text).unwrap());
        }
    }

    #[test]
    fn test_count_mismatch_fails() {
        let processor = BatchProcessor::new(Arc::new(ShortProvider), 8);
        let result = processor.process(chunks(3));
        assert!(matches!(
            result,
            Err(EmbeddingError::CountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_process_blocking() {
        let processor = Arc::new(BatchProcessor::new(
            Arc::new(HashingEmbedder::new(16).unwrap()),
            32,
        ));
        let result = processor.process_blocking(chunks(5)).await.unwrap();
        assert_eq!(result.pairs.len(), 5);
        assert_eq!(result.batches, 1);
    }
}
