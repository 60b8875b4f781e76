//! Repository chat pipeline
//!
//! [`RepoChat`] owns every long-lived collaborator: the ingestor, the shared
//! embedding provider, the generator and the index cache. It is built once
//! at startup and passed by reference to whatever drives the conversation.

mod answer;
mod query;

pub use answer::PendingAnswer;
pub use query::{run_query, QueryOutcome};

use crate::chunking;
use crate::config::Config;
use crate::embedding::{self, BatchProcessor, EmbeddingProvider};
use crate::error::{RepoChatError, Result};
use crate::generation::{Generator, OllamaGenerator};
use crate::index::{IndexCache, VectorIndex};
use crate::ingest::{GitIngestor, Ingestor, RepoUrl};
use crate::prompt::{Prompt, PromptAssembler};
use crate::retrieval::{self, Retriever};
use crate::session::ChatSession;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outcome of loading a repository
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    /// Normalized repository key
    pub key: String,
    pub chunks: usize,
    pub dimension: usize,
    pub embedding_model: String,
    /// True when the index came from the cache
    pub cached: bool,
    pub duration_ms: u64,
}

/// The production pipeline: git clone ingestion and Ollama generation
pub type DefaultRepoChat = RepoChat<GitIngestor, OllamaGenerator>;

pub struct RepoChat<I, G> {
    config: Config,
    ingestor: I,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: G,
    chunk_size: NonZeroUsize,
    retriever: Retriever,
    assembler: PromptAssembler,
    cache: Mutex<IndexCache>,
}

impl DefaultRepoChat {
    /// Build the production pipeline from configuration.
    ///
    /// Constructs the embedding provider, which may download a model.
    pub fn from_config(config: Config) -> Result<Self> {
        let ingestor = GitIngestor::new(config.ingest.clone_depth, config.ingest.max_file_bytes);
        let embedder = embedding::provider_from_config(&config.embedding)?;
        let generator = OllamaGenerator::from_config(&config.llm);
        Self::new(config, ingestor, embedder, generator)
    }
}

impl<I: Ingestor, G: Generator> RepoChat<I, G> {
    pub fn new(
        config: Config,
        ingestor: I,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: G,
    ) -> Result<Self> {
        let chunk_size = config.chunking.size()?;
        let retriever = Retriever::new(embedder.clone(), config.retrieval.top_k);
        let assembler = PromptAssembler::from_config(&config.prompt);
        let cache = Mutex::new(IndexCache::new(config.cache.capacity()));

        Ok(Self {
            config,
            ingestor,
            embedder,
            generator,
            chunk_size,
            retriever,
            assembler,
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn ingestor(&self) -> &I {
        &self.ingestor
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Validate and normalize a repository URL
    pub fn parse_url(&self, url: &str) -> Result<RepoUrl> {
        Ok(RepoUrl::parse(url, &self.config.ingest.allowed_hosts)?)
    }

    /// Index a repository, reusing the cached index when present
    pub async fn load(&self, url: &str) -> Result<IndexSummary> {
        let repo = self.parse_url(url)?;
        let start = Instant::now();

        let mut cache = self.cache.lock().await;
        let cached = cache.contains(repo.key());
        let index = cache
            .get_or_build(repo.key(), || self.build_index(&repo))
            .await?;

        Ok(self.summary(&repo, &index, cached, start))
    }

    /// Rebuild a repository's index from scratch.
    ///
    /// The previous index keeps serving until the rebuild succeeds; on
    /// failure it stays in place.
    pub async fn reindex(&self, url: &str) -> Result<IndexSummary> {
        let repo = self.parse_url(url)?;
        let start = Instant::now();

        let mut cache = self.cache.lock().await;
        let index = cache.rebuild(repo.key(), || self.build_index(&repo)).await?;

        Ok(self.summary(&repo, &index, false, start))
    }

    /// Drop a repository's index; returns whether one was cached
    pub async fn unload(&self, url: &str) -> Result<bool> {
        let repo = self.parse_url(url)?;
        Ok(self.cache.lock().await.invalidate(repo.key()))
    }

    pub async fn is_loaded(&self, url: &str) -> bool {
        match self.parse_url(url) {
            Ok(repo) => self.cache.lock().await.contains(repo.key()),
            Err(_) => false,
        }
    }

    /// Keys of the indexed repositories, most recently used first
    pub async fn loaded_repositories(&self) -> Vec<String> {
        self.cache.lock().await.keys()
    }

    /// Verify the model can serve requests
    pub async fn check_model(&self, model: &str) -> Result<()> {
        Ok(self.generator.ensure_model(model).await?)
    }

    /// Record the question and assemble its prompt.
    ///
    /// Empty questions and unloaded repositories are rejected before the
    /// session is touched. Once the question is recorded, any failure adds
    /// an error turn.
    pub async fn prepare(&self, session: &mut ChatSession, url: &str, query: &str) -> Result<Prompt> {
        let query = retrieval::validate_query(query)?;
        let repo = self.parse_url(url)?;
        let index = self
            .cache
            .lock()
            .await
            .get(repo.key())
            .ok_or_else(|| RepoChatError::RepositoryNotLoaded {
                key: repo.key().to_string(),
            })?;

        session.begin_query(query);

        let retriever = self.retriever.clone();
        let question = query.to_string();
        let retrieved = tokio::task::spawn_blocking(move || {
            retriever.retrieve(&question, &index, None)
        })
        .await
        .map_err(|e| RepoChatError::Other(anyhow::anyhow!("Retrieval task failed: {e}")))
        .and_then(|result| result);

        let chunks = match retrieved {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Retrieval failed: {}", e);
                session.fail(e.to_string());
                return Err(e);
            }
        };

        let history = session.history();
        let prompt = self
            .assembler
            .assemble(&chunks, &history[..history.len() - 1], query);
        info!(
            "Prompt ready: {} chunks, {} history turns, {} chars",
            prompt.context_chunks(),
            prompt.history_turns(),
            prompt.char_len()
        );
        Ok(prompt)
    }

    /// Ask a question and start streaming the answer into `session`
    pub async fn ask<'s>(
        &self,
        session: &'s mut ChatSession,
        url: &str,
        query: &str,
        model: &str,
    ) -> Result<PendingAnswer<'s>> {
        let prompt = self.prepare(session, url, query).await?;
        match self.generator.generate(&prompt, model).await {
            Ok(stream) => Ok(PendingAnswer::new(session, stream)),
            Err(e) => {
                warn!("Generation unavailable: {}", e);
                session.fail(e.to_string());
                Err(e.into())
            }
        }
    }

    async fn build_index(&self, repo: &RepoUrl) -> Result<VectorIndex> {
        let corpus = self.ingestor.ingest(repo).await?;
        let chunks = chunking::chunk(&corpus, self.chunk_size);
        info!("Chunked {} into {} chunks", repo, chunks.len());

        let processor = Arc::new(BatchProcessor::new(
            self.embedder.clone(),
            self.config.embedding.batch_size,
        ));
        let embedded = processor.process_blocking(chunks).await?;

        Ok(VectorIndex::build(embedded.pairs)?)
    }

    fn summary(&self, repo: &RepoUrl, index: &VectorIndex, cached: bool, start: Instant) -> IndexSummary {
        IndexSummary {
            key: repo.key().to_string(),
            chunks: index.len(),
            dimension: index.dimension(),
            embedding_model: self.embedder.model_name().to_string(),
            cached,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
