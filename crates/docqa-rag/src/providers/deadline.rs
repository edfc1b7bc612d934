//! Capability calls bounded by the configured deadline
//!
//! Embedding and composition are the only calls that wait on the network,
//! so these wrappers are the only place a timeout applies.

use std::time::Duration;
use tokio::time::timeout;

use crate::error::{CapabilityFault, Error, Result};

use super::composer::AnswerComposer;
use super::embedding::EmbeddingProvider;
use super::http::ensure_width;

/// Embed a batch, checking count and width of the response
pub async fn embed_many(
    embedder: &dyn EmbeddingProvider,
    texts: &[String],
    deadline: Duration,
) -> Result<Vec<Vec<f32>>> {
    let vectors = timeout(deadline, embedder.embed_many(texts))
        .await
        .map_err(|_| {
            Error::embedding(
                CapabilityFault::Unavailable,
                format!("{} timed out after {:?}", embedder.name(), deadline),
            )
        })??;

    if vectors.len() != texts.len() {
        return Err(Error::embedding(
            CapabilityFault::Unavailable,
            format!(
                "{} returned {} embeddings for {} texts",
                embedder.name(),
                vectors.len(),
                texts.len()
            ),
        ));
    }
    ensure_width(embedder.dimensions(), &vectors)?;
    Ok(vectors)
}

/// Embed a single text
pub async fn embed(embedder: &dyn EmbeddingProvider, text: &str, deadline: Duration) -> Result<Vec<f32>> {
    let vector = timeout(deadline, embedder.embed(text)).await.map_err(|_| {
        Error::embedding(
            CapabilityFault::Unavailable,
            format!("{} timed out after {:?}", embedder.name(), deadline),
        )
    })??;

    ensure_width(embedder.dimensions(), std::slice::from_ref(&vector))?;
    Ok(vector)
}

/// Compose an answer
pub async fn compose(composer: &dyn AnswerComposer, prompt: &str, deadline: Duration) -> Result<String> {
    timeout(deadline, composer.compose(prompt)).await.map_err(|_| {
        Error::composer(
            CapabilityFault::Unavailable,
            format!("{} timed out after {:?}", composer.name(), deadline),
        )
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Sluggish;

    #[async_trait]
    impl EmbeddingProvider for Sluggish {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model_id(&self) -> &str {
            "sluggish"
        }

        fn name(&self) -> &str {
            "sluggish"
        }
    }

    struct Short;

    #[async_trait]
    impl EmbeddingProvider for Short {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        async fn embed_many(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model_id(&self) -> &str {
            "short"
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let err = embed(&Sluggish, "hello", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingUnavailable {
                fault: CapabilityFault::Unavailable,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_count_mismatch_rejected() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_many(&Short, &texts, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable { .. }));
    }
}
