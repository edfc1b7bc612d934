//! Question-to-chunk retrieval over a persisted store

pub mod retriever;

pub use retriever::{RetrievalSession, Retriever};
