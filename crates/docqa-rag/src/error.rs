//! Error types for the document QA pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure class reported by an external capability (embedding or completion service)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFault {
    /// Quota or rate limit exceeded
    RateLimited,
    /// Credentials missing, invalid or forbidden
    Unauthorized,
    /// Network failure, timeout or server-side error
    Unavailable,
}

impl CapabilityFault {
    /// Classify an HTTP status returned by a capability endpoint
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited,
            401 | 403 => Self::Unauthorized,
            _ => Self::Unavailable,
        }
    }
}

impl fmt::Display for CapabilityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RateLimited => "rate limited",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// A single document could not be opened or parsed
    #[error("Failed to extract '{document}': {message}")]
    Extraction { document: String, message: String },

    /// Every document in an ingest batch failed extraction
    #[error("No document could be extracted ({} failed)", failures.len())]
    NoDocumentsExtracted { failures: Vec<String> },

    /// Invalid configuration (chunking parameters, credentials, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding capability failed or timed out
    #[error("Embedding service {fault}: {message}")]
    EmbeddingUnavailable {
        fault: CapabilityFault,
        message: String,
    },

    /// Answer composition capability failed or timed out
    #[error("Answer composer {fault}: {message}")]
    Composer {
        fault: CapabilityFault,
        message: String,
    },

    /// No store has been saved under this name
    #[error("Index store '{store}' not found")]
    StoreNotFound { store: String },

    /// The persisted artifacts are missing or inconsistent
    #[error("Index store '{store}' is corrupt: {reason}")]
    StoreCorrupt { store: String, reason: String },

    /// The retriever could not obtain an index to search
    #[error("Index '{store}' unavailable: {reason}")]
    IndexUnavailable { store: String, reason: String },

    /// A vector width does not match the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(document: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            document: document.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(fault: CapabilityFault, message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable {
            fault,
            message: message.into(),
        }
    }

    /// Create a composer error
    pub fn composer(fault: CapabilityFault, message: impl Into<String>) -> Self {
        Self::Composer {
            fault,
            message: message.into(),
        }
    }

    /// Create a store corruption error
    pub fn store_corrupt(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            store: store.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Capability fault carried by this error, if any
    pub fn fault(&self) -> Option<CapabilityFault> {
        match self {
            Error::EmbeddingUnavailable { fault, .. } | Error::Composer { fault, .. } => Some(*fault),
            _ => None,
        }
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.fault(),
            Some(CapabilityFault::RateLimited | CapabilityFault::Unavailable)
        )
    }

    /// Whether the caller has to ingest documents before asking again
    pub fn needs_ingest(&self) -> bool {
        matches!(
            self,
            Error::IndexUnavailable { .. } | Error::StoreNotFound { .. }
        )
    }

    /// Guidance shown to the end user for a failed query flow
    pub fn user_message(&self) -> &'static str {
        if self.needs_ingest() {
            "please ingest documents first"
        } else if self.is_retryable() {
            "ask again later"
        } else {
            "the request could not be completed"
        }
    }

    /// Guidance shown to the end user for a failed ingest flow
    pub fn ingest_message(&self) -> &'static str {
        "no index produced, nothing persisted"
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Extraction { .. } => (StatusCode::BAD_REQUEST, "extraction_error"),
            Error::NoDocumentsExtracted { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "no_documents_extracted")
            }
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::EmbeddingUnavailable { fault, .. } | Error::Composer { fault, .. } => {
                let status = match fault {
                    CapabilityFault::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    CapabilityFault::Unauthorized | CapabilityFault::Unavailable => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                };
                let error_type = if matches!(self, Error::Composer { .. }) {
                    "composer_error"
                } else {
                    "embedding_unavailable"
                };
                (status, error_type)
            }
            Error::StoreNotFound { .. } => (StatusCode::NOT_FOUND, "store_not_found"),
            Error::IndexUnavailable { .. } => (StatusCode::NOT_FOUND, "index_unavailable"),
            Error::StoreCorrupt { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "store_corrupt"),
            Error::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "hint": self.user_message(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_status() {
        use reqwest::StatusCode;
        assert_eq!(
            CapabilityFault::from_status(StatusCode::TOO_MANY_REQUESTS),
            CapabilityFault::RateLimited
        );
        assert_eq!(
            CapabilityFault::from_status(StatusCode::FORBIDDEN),
            CapabilityFault::Unauthorized
        );
        assert_eq!(
            CapabilityFault::from_status(StatusCode::BAD_GATEWAY),
            CapabilityFault::Unavailable
        );
    }

    #[test]
    fn test_user_messages() {
        let missing = Error::IndexUnavailable {
            store: "demo".into(),
            reason: "not found".into(),
        };
        assert_eq!(missing.user_message(), "please ingest documents first");

        let limited = Error::embedding(CapabilityFault::RateLimited, "quota");
        assert!(limited.is_retryable());
        assert_eq!(limited.user_message(), "ask again later");

        let denied = Error::composer(CapabilityFault::Unauthorized, "bad key");
        assert!(!denied.is_retryable());
        assert_ne!(denied.user_message(), "ask again later");
    }

    #[test]
    fn test_status_mapping() {
        let response = Error::StoreNotFound { store: "demo".into() }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = Error::composer(CapabilityFault::RateLimited, "slow down").into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
