//! Google Generative Language API providers (embeddings and generation)
//!
//! Authenticates with an API key sent in the `x-goog-api-key` header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CapabilityConfig, ComposerConfig, EmbeddingConfig};
use crate::error::{CapabilityFault, Error, Result};

use super::composer::AnswerComposer;
use super::embedding::EmbeddingProvider;
use super::http::{ensure_width, Capability, CapabilityClient};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// `models/<name>` form expected by the REST API
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn require_key(config: &CapabilityConfig) -> Result<String> {
    config
        .gemini_api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Config("GOOGLE_API_KEY is not set".to_string()))
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

// chunks are embedded as documents, questions as queries
const TASK_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";
const TASK_QUERY: &str = "RETRIEVAL_QUERY";

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Gemini embedding provider (embedding-001 by default)
pub struct GeminiEmbedder {
    http: CapabilityClient,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl GeminiEmbedder {
    /// Create a new Gemini embedder; fails without an API key
    pub fn new(embeddings: &EmbeddingConfig, capabilities: &CapabilityConfig) -> Result<Self> {
        Ok(Self {
            http: CapabilityClient::new(capabilities, Capability::Embedding)?,
            base_url: capabilities.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: require_key(capabilities)?,
            model: model_path(&embeddings.model),
            dimensions: embeddings.dimensions,
            batch_size: embeddings.batch_size,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, self.model, method)
    }

    fn request(&self, text: &str, task_type: &'static str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            content: Content::text(None, text),
            task_type,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response: EmbedResponse = self
            .http
            .post_json(
                &self.endpoint("embedContent"),
                &[(API_KEY_HEADER, self.api_key.as_str())],
                &self.request(text, TASK_QUERY),
            )
            .await?;

        let vector = response.embedding.values;
        ensure_width(self.dimensions, std::slice::from_ref(&vector))?;
        Ok(vector)
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size.max(1)) {
            let request = BatchEmbedRequest {
                requests: batch.iter().map(|t| self.request(t, TASK_DOCUMENT)).collect(),
            };
            let response: BatchEmbedResponse = self
                .http
                .post_json(
                    &self.endpoint("batchEmbedContents"),
                    &[(API_KEY_HEADER, self.api_key.as_str())],
                    &request,
                )
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(
                    CapabilityFault::Unavailable,
                    format!(
                        "{} embeddings returned for {} texts",
                        response.embeddings.len(),
                        batch.len()
                    ),
                ));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
            tracing::debug!("Embedded {}/{} texts via Gemini", embeddings.len(), texts.len());
        }

        ensure_width(self.dimensions, &embeddings)?;
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini chat model used to compose answers
pub struct GeminiComposer {
    http: CapabilityClient,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiComposer {
    /// Create a new Gemini composer; fails without an API key
    pub fn new(composer: &ComposerConfig, capabilities: &CapabilityConfig) -> Result<Self> {
        Ok(Self {
            http: CapabilityClient::new(capabilities, Capability::Composer)?,
            base_url: capabilities.gemini_base_url.trim_end_matches('/').to_string(),
            api_key: require_key(capabilities)?,
            model: model_path(&composer.model),
            temperature: composer.temperature,
        })
    }
}

#[async_trait]
impl AnswerComposer for GeminiComposer {
    async fn compose(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::info!("Generating answer with model: {}", self.model);

        let response: GenerateResponse = self
            .http
            .post_json(
                &format!("{}/{}:generateContent", self.base_url, self.model),
                &[(API_KEY_HEADER, self.api_key.as_str())],
                &request,
            )
            .await?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            Error::composer(CapabilityFault::Unavailable, "no candidates in Gemini response")
        })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::composer(
                CapabilityFault::Unavailable,
                format!(
                    "empty Gemini answer (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
