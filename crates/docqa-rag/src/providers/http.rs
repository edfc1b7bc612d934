//! Shared HTTP plumbing for remote capability providers

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::CapabilityConfig;
use crate::error::{CapabilityFault, Error, Result};

/// Which capability a client serves; decides the error variant it reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Embedding,
    Composer,
}

impl Capability {
    pub fn error(self, fault: CapabilityFault, message: impl Into<String>) -> Error {
        match self {
            Capability::Embedding => Error::embedding(fault, message),
            Capability::Composer => Error::composer(fault, message),
        }
    }
}

/// JSON-over-HTTP client with retry and fault classification
#[derive(Clone)]
pub struct CapabilityClient {
    client: Client,
    capability: Capability,
    max_retries: u32,
}

impl CapabilityClient {
    /// Create a client; the configured timeout bounds each attempt
    pub fn new(config: &CapabilityConfig, capability: Capability) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            capability,
            max_retries: config.max_retries,
        })
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// POST a JSON body and decode the JSON response, retrying retryable faults
    pub async fn post_json<Req, Resp>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        self.retry_request(|| self.post_once(url, headers, body)).await
    }

    async fn post_once<Req, Resp>(&self, url: &str, headers: &[(&str, &str)], body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            self.capability
                .error(CapabilityFault::Unavailable, format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.capability.error(
                CapabilityFault::from_status(status),
                format!("HTTP {} - {}", status, truncate(&body, 300)),
            ));
        }

        response.json::<Resp>().await.map_err(|e| {
            self.capability
                .error(CapabilityFault::Unavailable, format!("malformed response: {}", e))
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "{:?} request failed (attempt {}/{}), retrying in {:?}: {}",
                        self.capability,
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Reject vectors whose width differs from the provider's declared dimensions
pub fn ensure_width(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(Error::DimensionMismatch {
            expected,
            actual: v.len(),
        }),
        None => Ok(()),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_error_variant() {
        let err = Capability::Embedding.error(CapabilityFault::RateLimited, "quota");
        assert!(matches!(err, Error::EmbeddingUnavailable { .. }));
        let err = Capability::Composer.error(CapabilityFault::Unavailable, "down");
        assert!(matches!(err, Error::Composer { .. }));
    }

    #[test]
    fn test_ensure_width() {
        assert!(ensure_width(2, &[vec![0.0, 1.0]]).is_ok());
        assert!(matches!(
            ensure_width(2, &[vec![0.0, 1.0], vec![1.0]]),
            Err(Error::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = CapabilityConfig {
            timeout_secs: 2,
            max_retries: 0,
            ..CapabilityConfig::default()
        };
        let client = CapabilityClient::new(&config, Capability::Embedding).unwrap();
        let result: Result<serde_json::Value> = client
            .post_json("http://127.0.0.1:9/unreachable", &[], &serde_json::json!({}))
            .await;

        match result {
            Err(Error::EmbeddingUnavailable { fault, .. }) => {
                assert_eq!(fault, CapabilityFault::Unavailable)
            }
            other => panic!("expected EmbeddingUnavailable, got {:?}", other),
        }
    }
}
