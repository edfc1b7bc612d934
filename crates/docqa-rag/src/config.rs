//! Configuration for the document QA pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::generation::PromptProfile;
use crate::index::Metric;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Index storage location
    pub storage: StorageConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding backend configuration
    pub embeddings: EmbeddingConfig,
    /// Answer composer configuration
    pub composer: ComposerConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// External capability endpoints, credentials and timeouts
    pub capabilities: CapabilityConfig,
}

impl RagConfig {
    /// Load configuration: defaults, then the TOML file (explicit path or
    /// `DOCQA_CONFIG`), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os("DOCQA_CONFIG").map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML configuration text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_backend_defaults();
        Ok(config)
    }

    /// Section defaults name Gemini models. When a section picks another
    /// backend without naming a model, switch to that backend's default.
    pub fn apply_backend_defaults(&mut self) {
        let gemini = EmbeddingBackend::Gemini.default_model();
        if self.embeddings.backend != EmbeddingBackend::Gemini && self.embeddings.model == gemini {
            self.embeddings.model = self.embeddings.backend.default_model().to_string();
        }

        let gemini = ComposerBackend::Gemini.default_model();
        if self.composer.backend != ComposerBackend::Gemini && self.composer.model == gemini {
            self.composer.model = self.composer.backend.default_model().to_string();
        }
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.is_empty() {
                self.capabilities.gemini_api_key = Some(key);
            }
        }
        if let Some(dir) = std::env::var_os("DOCQA_STORAGE_DIR") {
            self.storage.root = PathBuf::from(dir);
        }
        if let Ok(store) = std::env::var("DOCQA_STORE") {
            self.storage.store_name = store;
        }
        if let Ok(url) = std::env::var("DOCQA_OLLAMA_URL") {
            self.capabilities.ollama_base_url = url;
        }
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be positive".into()));
        }
        if self.capabilities.timeout_secs == 0 {
            return Err(Error::Config("capabilities.timeout_secs must be positive".into()));
        }
        if self.embeddings.backend == EmbeddingBackend::Ollama && self.embeddings.model.starts_with("models/") {
            tracing::warn!(
                "Embedding model '{}' looks like a Gemini model but the backend is ollama",
                self.embeddings.model
            );
        }
        if self.composer.backend == ComposerBackend::Ollama && self.composer.model.starts_with("gemini") {
            tracing::warn!(
                "Composer model '{}' looks like a Gemini model but the backend is ollama",
                self.composer.model
            );
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Where index stores live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per store
    pub root: PathBuf,
    /// Store used when a caller does not name one
    pub store_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docqa-rag")
            .join("stores");

        Self {
            root,
            store_name: "default".to_string(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// `overlap < size` and `size > 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Embedding backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
    /// Offline feature hashing
    Hash,
}

impl EmbeddingBackend {
    /// Model used when the configuration names none
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "models/embedding-001",
            Self::Ollama => "nomic-embed-text",
            Self::Hash => "hash-sha256",
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend to use
    pub backend: EmbeddingBackend,
    /// Model identifier (recorded with every store)
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Texts per batch request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Gemini,
            model: EmbeddingBackend::Gemini.default_model().to_string(),
            dimensions: 768,
            batch_size: 100,
        }
    }
}

/// Answer composer backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComposerBackend {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl ComposerBackend {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-pro",
            Self::Ollama => "llama3.2:3b",
        }
    }
}

/// Answer composer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Backend to use
    pub backend: ComposerBackend,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Instruction template used to render prompts
    pub profile: PromptProfile,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            backend: ComposerBackend::Gemini,
            model: ComposerBackend::Gemini.default_model().to_string(),
            temperature: 0.3,
            profile: PromptProfile::DocumentQa,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the composer
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Similarity metric for newly built indexes
    pub metric: Metric,
    /// HNSW M parameter (connections per layer)
    pub hnsw_m: usize,
    /// HNSW ef_construction parameter
    pub ef_construction: usize,
    /// HNSW ef_search parameter
    pub ef_search: usize,
    /// Indexes up to this many vectors are searched exhaustively
    pub exact_search_threshold: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            hnsw_m: 16,
            ef_construction: 200,
            ef_search: 64,
            exact_search_threshold: 10_000,
        }
    }
}

/// External capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Deadline for a single embedding or composition call, retries included
    pub timeout_secs: u64,
    /// Number of retries for retryable failures
    pub max_retries: u32,
    /// Generative Language API base URL
    pub gemini_base_url: String,
    /// API key, usually taken from `GOOGLE_API_KEY`
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    /// Ollama base URL
    pub ollama_base_url: String,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_api_key: None,
            ollama_base_url: "http://localhost:11434".to_string(),
        }
    }
}

impl CapabilityConfig {
    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.capabilities.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(matches!(chunking.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_ollama_sections_get_ollama_models() {
        let config = RagConfig::from_toml(
            r#"
            [embeddings]
            backend = "ollama"

            [composer]
            backend = "ollama"
            "#,
        )
        .unwrap();
        assert_eq!(config.embeddings.model, "nomic-embed-text");
        assert_eq!(config.composer.model, "llama3.2:3b");
        assert!(config.validate().is_ok());

        let config = RagConfig::from_toml(
            r#"
            [embeddings]
            backend = "ollama"
            model = "mxbai-embed-large"
            dimensions = 1024
            "#,
        )
        .unwrap();
        assert_eq!(config.embeddings.model, "mxbai-embed-large");
        assert_eq!(config.embeddings.dimensions, 1024);
        assert_eq!(config.composer.model, "gemini-pro");
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 500

            [embeddings]
            backend = "hash"
            dimensions = 64

            [composer]
            profile = "resume_analysis"

            [index]
            metric = "l2"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Hash);
        assert_eq!(config.composer.profile, PromptProfile::ResumeAnalysis);
        assert_eq!(config.index.metric, Metric::L2);
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = RagConfig::from_toml("[chunking]\nchunk_size = \"big\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = RagConfig::default();
        config.capabilities.gemini_api_key = Some("secret".into());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
