//! Overlapping text chunking with natural-boundary preference
//!
//! Sizes and offsets are counted in chars so multi-byte text never splits
//! inside a code point.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length in characters
    chunk_size: usize,
    /// Characters repeated from the end of the previous chunk
    overlap: usize,
}

/// Boundary classes, most preferred first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Whitespace,
}

impl TextChunker {
    /// Create a chunker; fails fast when `overlap >= chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping chunks
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char, plus the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = offsets.len() - 1;

        let mut chunks = Vec::new();
        if total == 0 {
            return chunks;
        }

        let mut start = 0usize;
        let mut overlap = 0usize;

        loop {
            let limit = (start + self.chunk_size).min(total);

            if limit == total {
                chunks.push(self.make_chunk(text, &offsets, chunks.len(), start, total, overlap));
                break;
            }

            let floor = start + (self.overlap + 1).max(self.chunk_size / 2);
            let end = self.find_break(text, &offsets, start, floor, limit);

            chunks.push(self.make_chunk(text, &offsets, chunks.len(), start, end, overlap));

            start = end - self.overlap;
            overlap = self.overlap;
        }

        tracing::debug!(
            "Chunked {} chars into {} chunks (size={}, overlap={})",
            total,
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }

    fn make_chunk(
        &self,
        text: &str,
        offsets: &[usize],
        index: usize,
        start: usize,
        end: usize,
        overlap: usize,
    ) -> Chunk {
        Chunk {
            index,
            text: text[offsets[start]..offsets[end]].to_string(),
            start,
            overlap,
        }
    }

    /// Last natural boundary in `[floor, limit]`, or the hard cut at `limit`
    fn find_break(
        &self,
        text: &str,
        offsets: &[usize],
        start: usize,
        floor: usize,
        limit: usize,
    ) -> usize {
        let segment = &text[offsets[start]..offsets[limit]];
        let window_start = offsets[floor];
        let window = &text[window_start..offsets[limit]];
        let window_rel = window_start - offsets[start];

        for boundary in [Boundary::Paragraph, Boundary::Sentence, Boundary::Whitespace] {
            let candidate = match boundary {
                Boundary::Paragraph => window
                    .match_indices("\n\n")
                    .map(|(i, sep)| i + sep.len())
                    .last(),
                Boundary::Sentence => sentence_boundaries(segment, window_rel).last(),
                Boundary::Whitespace => window
                    .char_indices()
                    .filter(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8())
                    .last(),
            };

            if let Some(byte) = candidate {
                if let Ok(pos) = offsets.binary_search(&(window_start + byte)) {
                    if pos >= floor {
                        return pos;
                    }
                }
            }
        }

        limit
    }
}

/// Sentence starts that fall strictly inside the window, relative to it.
///
/// Segmentation covers the whole chunk so a sentence that began before the
/// window is not mistaken for one starting at its edge.
fn sentence_boundaries(segment: &str, window_rel: usize) -> impl Iterator<Item = usize> + '_ {
    segment
        .split_sentence_bound_indices()
        .map(|(i, _)| i)
        .filter(move |&i| i > window_rel)
        .map(move |i| i - window_rel)
}

/// Rebuild the source text from chunks by dropping each declared overlap
pub fn reassemble(chunks: &[Chunk]) -> String {
    chunks.iter().map(Chunk::fresh_text).collect()
}
