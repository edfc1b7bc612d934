//! docqa-rag: question answering over uploaded documents
//!
//! Documents are extracted to text, split into overlapping chunks, embedded
//! and stored in a named vector index on disk. Questions are answered by
//! retrieving the most similar chunks and handing them to a completion
//! model together with a versioned prompt template.
//!
//! The embedding and completion services are capability traits
//! ([`providers::EmbeddingProvider`], [`providers::AnswerComposer`]) with
//! Gemini, Ollama and offline backends selected by configuration.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{CapabilityFault, Error, Result};
pub use generation::PromptProfile;
pub use index::{IndexStore, Metric, VectorIndex};
pub use pipeline::{Analysis, Pipeline};
pub use retrieval::Retriever;
pub use types::{DocumentFormat, DocumentInput, IngestReport, QueryAnswer, RetrievalResult};
