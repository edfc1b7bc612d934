//! Capability providers: embeddings and answer composition
//!
//! The pipeline only sees the `EmbeddingProvider` and `AnswerComposer`
//! traits; the backend is chosen from configuration here.

pub mod composer;
pub mod deadline;
pub mod embedding;
pub mod gemini;
pub mod hash;
pub mod http;
pub mod ollama;

use std::sync::Arc;

use crate::config::{ComposerBackend, EmbeddingBackend, RagConfig};
use crate::error::Result;

pub use composer::AnswerComposer;
pub use embedding::EmbeddingProvider;
pub use gemini::{GeminiComposer, GeminiEmbedder};
pub use hash::HashEmbedder;
pub use ollama::{OllamaComposer, OllamaEmbedder};

/// Build the configured embedding provider
pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
        EmbeddingBackend::Gemini => Arc::new(GeminiEmbedder::new(
            &config.embeddings,
            &config.capabilities,
        )?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
            &config.embeddings,
            &config.capabilities,
        )?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)?),
    };

    tracing::info!(
        "Embedding provider: {} ({}, {} dims)",
        embedder.name(),
        embedder.model_id(),
        embedder.dimensions()
    );
    Ok(embedder)
}

/// Build the configured answer composer
pub fn build_composer(config: &RagConfig) -> Result<Arc<dyn AnswerComposer>> {
    let composer: Arc<dyn AnswerComposer> = match config.composer.backend {
        ComposerBackend::Gemini => Arc::new(GeminiComposer::new(
            &config.composer,
            &config.capabilities,
        )?),
        ComposerBackend::Ollama => Arc::new(OllamaComposer::new(
            &config.composer,
            &config.capabilities,
        )?),
    };

    tracing::info!("Answer composer: {} ({})", composer.name(), composer.model());
    Ok(composer)
}
