//! Core data types shared across the pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::generation::PromptProfile;

/// Declared format of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Infer the format from a file name
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;

        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Infer the format from a MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.split(';').next().map(str::trim) {
            Some("application/pdf") => Some(Self::Pdf),
            Some("text/plain") | Some("text/markdown") => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Format from file name first, then MIME type
    pub fn detect(filename: &str, mime: Option<&str>) -> Option<Self> {
        Self::from_filename(filename).or_else(|| mime.and_then(Self::from_mime))
    }
}

/// Raw uploaded document. Discarded after extraction.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Display name (usually the uploaded file name)
    pub name: String,
    /// Declared format; `None` when it could not be determined
    pub format: Option<DocumentFormat>,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    /// Create a document, detecting the format from its name
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let format = DocumentFormat::from_filename(&name);
        Self {
            name,
            format,
            bytes: bytes.into(),
        }
    }

    /// Create a document with an explicit format
    pub fn with_format(name: impl Into<String>, format: DocumentFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            format: Some(format),
            bytes: bytes.into(),
        }
    }

    /// Plain text document
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_format(name, DocumentFormat::PlainText, text.into().into_bytes())
    }
}

/// A bounded, overlapping segment of the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in source order
    pub index: usize,
    /// Chunk content
    pub text: String,
    /// Offset of the first character in the source text (chars, not bytes)
    pub start: usize,
    /// Number of leading characters shared with the previous chunk
    pub overlap: usize,
}

impl Chunk {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Text that is new relative to the previous chunk
    pub fn fresh_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None if self.overlap == 0 => &self.text,
            None => "",
        }
    }
}

/// A chunk paired with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Slot in the vector index
    pub slot: usize,
    /// Similarity score (higher is closer)
    pub score: f32,
    /// Chunk content
    pub chunk: Chunk,
}

/// Retrieved chunks ordered by descending similarity, at most K long
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Best match, if any
    pub fn top(&self) -> Option<&ScoredChunk> {
        self.hits.first()
    }
}

/// Document dropped from an ingest batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// Outcome of the ingest flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Store that was (re)built
    pub store: String,
    /// Chunks embedded and persisted
    pub chunks_indexed: usize,
    /// Documents that contributed text
    pub documents_indexed: usize,
    /// Documents skipped because extraction failed
    pub skipped: Vec<SkippedDocument>,
    /// Whether a new store generation was written
    pub persisted: bool,
}

/// Source reference attached to an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSource {
    pub slot: usize,
    pub score: f32,
    pub snippet: String,
}

impl AnswerSource {
    const SNIPPET_CHARS: usize = 200;

    pub fn from_hit(hit: &ScoredChunk) -> Self {
        let mut snippet: String = hit.chunk.text.chars().take(Self::SNIPPET_CHARS).collect();
        if hit.chunk.char_len() > Self::SNIPPET_CHARS {
            snippet.push_str("...");
        }
        Self {
            slot: hit.slot,
            score: hit.score,
            snippet,
        }
    }
}

/// Outcome of the query flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Composed answer text
    pub answer: String,
    /// Chunks the answer was conditioned on
    pub sources: Vec<AnswerSource>,
    /// Template the prompt was rendered with
    pub profile: PromptProfile,
}
