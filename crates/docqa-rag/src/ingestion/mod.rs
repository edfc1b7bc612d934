//! Document ingestion: text extraction and chunking

pub mod chunker;
pub mod extractor;

pub use chunker::{reassemble, TextChunker};
pub use extractor::{DocumentExtractor, ExtractedBatch, ExtractedDocument};
