//! Repository ingestion
//!
//! Turns a repository URL into one plaintext corpus. The pipeline treats the
//! result as opaque text; the only structure it relies on is the file header
//! layout described in [`corpus`].

pub mod corpus;
mod git;
mod repo_url;

pub use git::{clone_repository, render_corpus, GitIngestor};
pub use repo_url::RepoUrl;

use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Host '{host}' is not allowed (allowed: {allowed:?})")]
    HostNotAllowed { host: String, allowed: Vec<String> },

    #[error("Clone of {url} failed: {message}")]
    Clone { url: String, message: String },

    #[error("Repository {url} has no extractable text")]
    EmptyRepository { url: String },

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// Source of repository text
pub trait Ingestor: Send + Sync {
    /// Fetch the repository and flatten it into a single corpus.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when the repository holds no text.
    fn ingest(&self, repo: &RepoUrl) -> impl Future<Output = Result<String, IngestError>> + Send;
}
