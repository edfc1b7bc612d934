//! Prompt assembly for answer composition

pub mod prompt;

pub use prompt::{
    PromptBuilder, PromptProfile, PromptTemplate, CONTEXT_DELIMITER, DOCUMENT_QA_V1,
    EMPTY_CONTEXT, RESUME_ANALYSIS_V1,
};
