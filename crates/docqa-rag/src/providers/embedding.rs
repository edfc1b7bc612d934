//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;

/// Maps text to fixed-width vectors
///
/// Implementations:
/// - `GeminiEmbedder`: Google Generative Language API (embedding-001)
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text and similar)
/// - `HashEmbedder`: Offline feature hashing
///
/// Output must be deterministic for identical input under a fixed `model_id`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding width
    fn dimensions(&self) -> usize;

    /// Model identifier recorded with every store built from this provider
    fn model_id(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}
