//! Answer composer trait for text completion backends

use async_trait::async_trait;

use crate::error::Result;

/// Turns a rendered prompt into answer text
///
/// Implementations:
/// - `GeminiComposer`: Google Generative Language API (gemini-pro)
/// - `OllamaComposer`: Local Ollama server
#[async_trait]
pub trait AnswerComposer: Send + Sync {
    /// Complete the prompt. One blocking round trip, no streaming.
    async fn compose(&self, prompt: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model being used
    fn model(&self) -> &str;
}
