//! Retriever: load a store, embed the question, search the index

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::index::{store::validate_name, IndexStore, LoadedIndex, StoreLocks, StoreManifest, VectorIndex};
use crate::providers::{deadline, EmbeddingProvider};
use crate::types::RetrievalResult;

/// Opens stores for querying
#[derive(Clone)]
pub struct Retriever {
    store: IndexStore,
    locks: Arc<StoreLocks>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_config: IndexConfig,
    top_k: usize,
    timeout: Duration,
}

impl Retriever {
    pub fn new(
        store: IndexStore,
        locks: Arc<StoreLocks>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_config: IndexConfig,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            embedder,
            index_config,
            top_k,
            timeout,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load store `name` once for a batch of questions.
    ///
    /// A missing or unreadable store is reported as `IndexUnavailable`.
    pub async fn open(&self, name: &str) -> Result<RetrievalSession> {
        validate_name(name)?;

        let guard = self.locks.lock_for(name).read_owned().await;
        let store = self.store.clone();
        let config = self.index_config.clone();
        let store_name = name.to_string();

        let loaded = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            store.load(&store_name, &config)
        })
        .await;
        self.locks.release(name);
        let loaded =
            loaded.map_err(|e| Error::internal(format!("store load task failed: {}", e)))?;

        let LoadedIndex { index, manifest } = loaded.map_err(|e| match e {
            Error::StoreNotFound { store } => Error::IndexUnavailable {
                store,
                reason: "no documents have been ingested".into(),
            },
            Error::StoreCorrupt { store, reason } => Error::IndexUnavailable { store, reason },
            other => other,
        })?;

        if manifest.dimensions != self.embedder.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: manifest.dimensions,
                actual: self.embedder.dimensions(),
            });
        }
        if manifest.embedding_model != self.embedder.model_id() {
            tracing::warn!(
                "Store '{}' was built with '{}' but queries use '{}'",
                name,
                manifest.embedding_model,
                self.embedder.model_id()
            );
        }

        tracing::debug!(
            "Opened store '{}' ({} vectors, generation {})",
            name,
            manifest.vector_count,
            manifest.generation
        );

        Ok(RetrievalSession {
            index: Arc::new(index),
            manifest,
            embedder: self.embedder.clone(),
            top_k: self.top_k,
            timeout: self.timeout,
        })
    }

    /// Open the store and retrieve for a single question
    pub async fn retrieve(&self, name: &str, question: &str) -> Result<RetrievalResult> {
        self.open(name).await?.retrieve(question).await
    }
}

/// A loaded store ready to answer retrieval requests
pub struct RetrievalSession {
    index: Arc<VectorIndex>,
    manifest: StoreManifest,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    timeout: Duration,
}

impl fmt::Debug for RetrievalSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalSession")
            .field("store", &self.manifest.store)
            .field("generation", &self.manifest.generation)
            .field("len", &self.index.len())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl RetrievalSession {
    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    /// Number of chunks in the loaded store
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Top-k chunks for `question`, most similar first
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question is empty".into()));
        }

        let query = deadline::embed(self.embedder.as_ref(), question, self.timeout).await?;
        let result = self.index.search(&query, self.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks from '{}' (top score {:.3})",
            result.len(),
            self.manifest.store,
            result.top().map(|hit| hit.score).unwrap_or(0.0)
        );
        Ok(result)
    }
}
