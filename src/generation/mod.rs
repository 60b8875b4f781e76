//! Answer generation against a local model runtime
//!
//! A [`Generator`] turns an assembled prompt into a lazy stream of text
//! fragments. The stream is finite and cannot be restarted; dropping it
//! cancels generation.

mod ollama;

pub use ollama::{OllamaGenerator, SamplingOptions};

use crate::prompt::Prompt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Model runtime unreachable: {0}")]
    Unreachable(String),

    #[error("Model '{model}' is not available locally")]
    ModelMissing { model: String },

    #[error("Generation stream failed: {0}")]
    Stream(String),

    #[error("No response within {secs}s")]
    Timeout { secs: u64 },
}

/// Fragments of a generated answer, in order
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

pub trait Generator: Send + Sync {
    /// Make sure `model` can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unreachable`] when the runtime does not
    /// answer and [`GenerationError::ModelMissing`] when the model is absent
    /// and cannot be pulled.
    fn ensure_model(&self, model: &str) -> impl Future<Output = Result<(), GenerationError>> + Send;

    /// Start generating an answer for `prompt`.
    ///
    /// # Errors
    ///
    /// Fails before any fragment is produced when the runtime is unreachable
    /// or the model is missing. Later failures arrive as stream items.
    fn generate(
        &self,
        prompt: &Prompt,
        model: &str,
    ) -> impl Future<Output = Result<TextStream, GenerationError>> + Send;
}
