//! Ollama-based providers for embeddings and answer composition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CapabilityConfig, ComposerConfig, EmbeddingConfig};
use crate::error::Result;

use super::composer::AnswerComposer;
use super::embedding::EmbeddingProvider;
use super::http::{ensure_width, Capability, CapabilityClient};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    http: CapabilityClient,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(embeddings: &EmbeddingConfig, capabilities: &CapabilityConfig) -> Result<Self> {
        Ok(Self {
            http: CapabilityClient::new(capabilities, Capability::Embedding)?,
            base_url: capabilities.ollama_base_url.trim_end_matches('/').to_string(),
            model: embeddings.model.clone(),
            dimensions: embeddings.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    // Ollama has no batch endpoint; `embed_many` uses the sequential default
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbedResponse = self
            .http
            .post_json(&format!("{}/api/embeddings", self.base_url), &[], &request)
            .await?;

        ensure_width(self.dimensions, std::slice::from_ref(&response.embedding))?;
        Ok(response.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama generation model used to compose answers
pub struct OllamaComposer {
    http: CapabilityClient,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaComposer {
    /// Create a new Ollama composer
    pub fn new(composer: &ComposerConfig, capabilities: &CapabilityConfig) -> Result<Self> {
        Ok(Self {
            http: CapabilityClient::new(capabilities, Capability::Composer)?,
            base_url: capabilities.ollama_base_url.trim_end_matches('/').to_string(),
            model: composer.model.clone(),
            temperature: composer.temperature,
        })
    }
}

#[async_trait]
impl AnswerComposer for OllamaComposer {
    async fn compose(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        tracing::info!("Generating answer with model: {}", self.model);

        let response: GenerateResponse = self
            .http
            .post_json(&format!("{}/api/generate", self.base_url), &[], &request)
            .await?;

        Ok(response.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_is_not_streaming() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.3 },
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["model"], "llama3");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let capabilities = CapabilityConfig {
            ollama_base_url: "http://localhost:11434/".into(),
            ..CapabilityConfig::default()
        };
        let embedder = OllamaEmbedder::new(&EmbeddingConfig::default(), &capabilities).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:11434");
        assert_eq!(embedder.name(), "ollama");
    }
}
