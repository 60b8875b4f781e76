//! Query-time retrieval
//!
//! Embeds a question with the same provider that built the index and returns
//! the nearest chunks, closest first.

use crate::chunking::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RepoChatError, Result};
use crate::index::VectorIndex;
use std::sync::Arc;
use tracing::debug;

/// Default number of chunks handed to the prompt
pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved chunk with its distance to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Reject empty or whitespace-only questions before any model is touched
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(RepoChatError::InvalidQuery(
            "Query text cannot be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Top-`k` chunks with distances, nearest first
pub fn retrieve_scored(
    query: &str,
    index: &VectorIndex,
    k: usize,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<ScoredChunk>> {
    let query = validate_query(query)?;
    if index.is_empty() {
        return Err(RepoChatError::EmptyIndex);
    }

    let embedding = embedder.embed(query)?;
    let hits = index.search(&embedding, k)?;

    debug!(
        "Retrieved {} chunks (best distance {:?})",
        hits.len(),
        hits.first().map(|h| h.distance)
    );

    Ok(hits
        .into_iter()
        .map(|hit| ScoredChunk {
            chunk: hit.chunk.clone(),
            distance: hit.distance,
        })
        .collect())
}

/// Top-`k` chunks, nearest first, distances discarded
pub fn retrieve(
    query: &str,
    index: &VectorIndex,
    k: usize,
    embedder: &dyn EmbeddingProvider,
) -> Result<Vec<Chunk>> {
    Ok(retrieve_scored(query, index, k, embedder)?
        .into_iter()
        .map(|scored| scored.chunk)
        .collect())
}

/// Retriever bound to a provider and a default `k`
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    /// Retrieve with the configured `k`, or `k_override` when given
    pub fn retrieve(
        &self,
        query: &str,
        index: &VectorIndex,
        k_override: Option<usize>,
    ) -> Result<Vec<Chunk>> {
        retrieve(
            query,
            index,
            k_override.unwrap_or(self.top_k),
            self.embedder.as_ref(),
        )
    }

    pub fn retrieve_scored(
        &self,
        query: &str,
        index: &VectorIndex,
        k_override: Option<usize>,
    ) -> Result<Vec<ScoredChunk>> {
        retrieve_scored(
            query,
            index,
            k_override.unwrap_or(self.top_k),
            self.embedder.as_ref(),
        )
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }
}
