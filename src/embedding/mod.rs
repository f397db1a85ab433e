//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and a remote implementation that
//! calls an OpenAI-compatible `/embeddings` endpoint. The provider is created
//! via [`create_provider`] from configuration.

pub mod remote;

use anyhow::Result;

/// Number of dimensions in the embedding vectors (text-embedding-3-small).
pub const EMBEDDING_DIM: usize = 1536;

/// Trait for embedding text into vectors.
///
/// Implementations produce vectors of exactly [`EMBEDDING_DIM`] dimensions.
/// All methods are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"remote"` is supported (OpenAI-compatible `/embeddings`).
pub fn create_provider(
    completion: &crate::config::CompletionConfig,
    embedding: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match embedding.provider.as_str() {
        "remote" => {
            let provider = remote::RemoteEmbeddingProvider::new(
                &completion.base_url,
                &completion.api_key,
                &embedding.model,
            );
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: remote"),
    }
}
