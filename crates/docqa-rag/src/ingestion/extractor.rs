//! Plain-text extraction from uploaded documents

use crate::error::{Error, Result};
use crate::types::{DocumentFormat, DocumentInput, SkippedDocument};

/// Text extracted from one document, page by page
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Document name
    pub name: String,
    /// Page texts in page order; pages without text are empty strings
    pub pages: Vec<String>,
}

impl ExtractedDocument {
    /// Pages joined in order, trimmed
    pub fn text(&self) -> String {
        self.pages.join("\n").trim().to_string()
    }
}

/// Combined text of an ingest batch
#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    /// All document texts in upload order
    pub text: String,
    /// Documents that contributed non-empty text
    pub documents: usize,
    /// Documents that could not be opened
    pub skipped: Vec<SkippedDocument>,
}

/// Converts raw document bytes into plain text
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Extract every document, skipping the ones that cannot be parsed.
    ///
    /// Fails only when the batch is empty or every document failed.
    pub fn extract_batch(documents: &[DocumentInput]) -> Result<ExtractedBatch> {
        if documents.is_empty() {
            return Err(Error::InvalidInput("no documents supplied".into()));
        }

        let mut texts = Vec::new();
        let mut skipped = Vec::new();
        let mut extracted = 0usize;

        for doc in documents {
            match Self::extract(doc) {
                Ok(parsed) => {
                    extracted += 1;
                    let text = parsed.text();
                    tracing::debug!(
                        "Extracted '{}': {} pages, {} chars",
                        doc.name,
                        parsed.pages.len(),
                        text.chars().count()
                    );
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping document '{}': {}", doc.name, e);
                    skipped.push(SkippedDocument {
                        name: doc.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if extracted == 0 {
            return Err(Error::NoDocumentsExtracted {
                failures: skipped.into_iter().map(|s| s.reason).collect(),
            });
        }

        Ok(ExtractedBatch {
            documents: texts.len(),
            text: texts.join("\n\n"),
            skipped,
        })
    }

    /// Extract a single document
    pub fn extract(doc: &DocumentInput) -> Result<ExtractedDocument> {
        let pages = match doc.format {
            Some(DocumentFormat::Pdf) => Self::extract_pdf(&doc.name, &doc.bytes)?,
            Some(DocumentFormat::PlainText) => vec![Self::extract_plain(&doc.name, &doc.bytes)?],
            None => return Err(Error::extraction(&doc.name, "unsupported document format")),
        };

        Ok(ExtractedDocument {
            name: doc.name.clone(),
            pages,
        })
    }

    /// Page-by-page PDF text; unreadable pages yield ""
    fn extract_pdf(name: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(name, format!("failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_number in pages.keys() {
            let text = match doc.extract_text(&[*page_number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!("No text on page {} of '{}': {}", page_number, name, e);
                    String::new()
                }
            };
            texts.push(text);
        }

        Ok(texts)
    }

    fn extract_plain(name: &str, data: &[u8]) -> Result<String> {
        std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|e| Error::extraction(name, format!("not valid UTF-8: {}", e)))
    }
}
