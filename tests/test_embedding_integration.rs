/// Indexing Integration Test: corpus -> chunks -> embeddings -> index
///
/// Renders a checkout from disk, chunks it, embeds it and searches it.
use repochat::chunking::{self, Chunk};
use repochat::embedding::{BatchProcessor, EmbeddingProvider, FastEmbedProvider, HashingEmbedder};
use repochat::index::VectorIndex;
use repochat::ingest::render_corpus;
use repochat::retrieval;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &std::path::Path, path: &str, contents: &str) {
    let full = root.join(path);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, contents).unwrap();
}

fn sample_checkout() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "src/auth.rs",
        "pub fn verify_password(hash: &str, password: &str) -> bool {\n    \
         bcrypt::verify(password, hash).unwrap_or(false)\n}\n",
    );
    write(
        temp.path(),
        "src/render.rs",
        "pub fn render_sidebar(widgets: &[Widget]) -> Html {\n    \
         widgets.iter().map(Widget::html).collect()\n}\n",
    );
    write(
        temp.path(),
        "README.md",
        "# widgets\n\nA small dashboard toolkit with authentication.\n",
    );
    write(temp.path(), "target/debug/junk.bin", "ignored by .gitignore");
    write(temp.path(), ".gitignore", "target/\n");
    temp
}

async fn build(
    provider: Arc<dyn EmbeddingProvider>,
    chunks: Vec<Chunk>,
) -> VectorIndex {
    let processor = Arc::new(BatchProcessor::new(provider, 4));
    let result = processor.process_blocking(chunks).await.unwrap();
    VectorIndex::build(result.pairs).unwrap()
}

#[tokio::test]
async fn test_checkout_to_index_with_labels() {
    let checkout = sample_checkout();
    let corpus = render_corpus(checkout.path(), "widgets", 1_048_576).unwrap();

    assert!(corpus.contains("FILE: src/auth.rs"));
    assert!(!corpus.contains("ignored by .gitignore"));
    println!("✓ Rendered corpus ({} chars)", corpus.chars().count());

    let chunks = chunking::chunk(&corpus, NonZeroUsize::new(120).unwrap());
    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, corpus);
    for path in ["README.md", "src/auth.rs", "src/render.rs"] {
        assert!(chunks.iter().any(|c| c.label.as_deref() == Some(path)));
    }

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(512).unwrap());
    let index = build(provider.clone(), chunks).await;
    assert_eq!(index.dimension(), 512);

    let hits = retrieval::retrieve("verify_password bcrypt", &index, 1, provider.as_ref()).unwrap();
    assert_eq!(hits.len(), 1);
    // A window boundary can split at most one of the two query tokens
    assert!(hits[0].text.contains("verify_password") || hits[0].text.contains("bcrypt"));
    println!("✓ Nearest chunk labelled {:?}", hits[0].label);
}

#[tokio::test]
async fn test_hashing_embeddings_are_deterministic() {
    let first = HashingEmbedder::new(128).unwrap();
    let second = HashingEmbedder::new(128).unwrap();

    let text = "fn main() { println!(\"hello\"); }";
    assert_eq!(first.embed(text).unwrap(), second.embed(text).unwrap());
}

#[tokio::test]
#[ignore] // Requires model download (~90MB) - run with: cargo test -- --ignored
async fn test_fastembed_full_pipeline() {
    let checkout = sample_checkout();
    let corpus = render_corpus(checkout.path(), "widgets", 1_048_576).unwrap();
    let chunks = chunking::chunk(&corpus, NonZeroUsize::new(200).unwrap());

    let provider: Arc<dyn EmbeddingProvider> = Arc::new(
        FastEmbedProvider::with_default_model().expect("Failed to initialize embedding provider"),
    );
    println!(
        "✓ Embedding provider initialized: {} ({}D)",
        provider.model_name(),
        provider.dimension()
    );

    let index = build(provider.clone(), chunks).await;
    assert_eq!(index.dimension(), 384);

    let first = provider.embed("how are passwords checked").unwrap();
    let second = provider.embed("how are passwords checked").unwrap();
    assert_eq!(first, second);

    let hits = retrieval::retrieve("how are passwords checked", &index, 2, provider.as_ref()).unwrap();
    assert_eq!(hits.len(), 2);
}
