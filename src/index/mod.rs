//! In-memory vector index and the per-repository cache that owns it
mod cache;
mod vector_index;

pub use cache::IndexCache;
pub use vector_index::{SearchHit, VectorIndex, VectorIndexError};
