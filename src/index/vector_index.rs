/// Exact nearest-neighbour index over chunk embeddings
use crate::chunking::Chunk;
use ndarray::{Array2, ArrayView1};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("No chunks to index")]
    Empty,

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Embedding dimension must be greater than 0")]
    ZeroDimension,
}

/// One search result
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub chunk: &'a Chunk,
    /// Squared Euclidean distance to the query
    pub distance: f32,
    /// Insertion position of the chunk
    pub position: usize,
}

/// Immutable vector index
///
/// Stores vectors row-wise in one matrix and answers queries with a linear
/// scan under squared Euclidean distance. Results are ordered by ascending
/// distance; equal distances keep insertion order.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Array2<f32>,
}

impl VectorIndex {
    /// Build the index in one pass.
    ///
    /// Fails with [`VectorIndexError::Empty`] when `pairs` is empty and with
    /// [`VectorIndexError::InvalidDimension`] when vector lengths disagree.
    pub fn build(pairs: Vec<(Chunk, Vec<f32>)>) -> Result<Self, VectorIndexError> {
        let dimension = pairs.first().ok_or(VectorIndexError::Empty)?.1.len();
        if dimension == 0 {
            return Err(VectorIndexError::ZeroDimension);
        }

        let rows = pairs.len();
        let mut flat = Vec::with_capacity(rows * dimension);
        let mut chunks = Vec::with_capacity(rows);

        for (chunk, vector) in pairs {
            if vector.len() != dimension {
                return Err(VectorIndexError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            flat.extend_from_slice(&vector);
            chunks.push(chunk);
        }

        let vectors = Array2::from_shape_vec((rows, dimension), flat).map_err(|_| {
            VectorIndexError::InvalidDimension {
                expected: dimension,
                actual: 0,
            }
        })?;

        tracing::debug!("Built vector index: {} chunks, {}D", rows, dimension);
        Ok(Self { chunks, vectors })
    }

    /// Return the `k` nearest chunks to `query`, closest first.
    ///
    /// Returns every chunk when fewer than `k` are stored.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>, VectorIndexError> {
        if query.len() != self.dimension() {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension(),
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let distance = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                // NaN ranks after every real distance
                (i, if distance.is_nan() { f32::INFINITY } else { distance })
            })
            .collect();

        // Stable sort: ties stay in insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| SearchHit {
                chunk: &self.chunks[position],
                distance,
                position,
            })
            .collect())
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimension
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Chunks in insertion order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}
