//! Offline embedding provider based on feature hashing
//!
//! Each lowercase word token is hashed with SHA-256; the digest picks a
//! bucket and a sign. The result is L2-normalized, so texts sharing words
//! have positive cosine similarity. Deterministic and network-free.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Deterministic bag-of-words embedder
pub struct HashEmbedder {
    dimensions: usize,
    model_id: String,
}

impl HashEmbedder {
    /// Create a hash embedder with the given width
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::Config("hash embedder needs positive dimensions".into()));
        }
        Ok(Self {
            dimensions,
            model_id: format!("hash-sha256-{}", dimensions),
        })
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let mut tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            tokens.push(&lowered);
        }

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        } else {
            // Every token cancelled out
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Metric;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed_text("Alice works at Acme");
        let b = embedder.embed_text("Alice works at Acme");
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashEmbedder::new(256).unwrap();
        let doc = embedder.embed_text("Alice works at Acme as a data engineer.");
        let related = embedder.embed_text("Where does Alice work at Acme?");
        let unrelated = embedder.embed_text("Quarterly rainfall in the northern valleys");

        let metric = Metric::Cosine;
        assert!(metric.similarity(&doc, &related) > metric.similarity(&doc, &unrelated));
    }

    #[test]
    fn test_blank_text_still_embeds() {
        let embedder = HashEmbedder::new(16).unwrap();
        let v = embedder.embed_text("   ");
        assert!(v.iter().any(|x| *x != 0.0));
    }
}
