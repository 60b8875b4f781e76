//! repochat - chat with a public git repository using a local model
//!
//! Clones a repository, splits its text into fixed-size chunks, embeds them
//! locally and answers questions with a locally hosted model (Ollama), using
//! the nearest chunks as context.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
pub mod session;

pub use error::{RepoChatError, Result};
pub use pipeline::{DefaultRepoChat, IndexSummary, PendingAnswer, QueryOutcome, RepoChat};
