//! Prompt templates for answer composition
//!
//! Templates are versioned constants. Editing the wording of one changes
//! answer behavior, so a changed template gets a new id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::RetrievalResult;

/// Separator placed between retrieved chunks in the context slot
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Context slot content when retrieval found nothing
pub const EMPTY_CONTEXT: &str =
    "(No relevant document content was retrieved. Answer from general knowledge.)";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

/// Instruction template with `{context}` and `{question}` slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Stable identifier, `<profile>/v<N>`
    pub id: &'static str,
    body: &'static str,
}

/// General question answering over uploaded documents
pub const DOCUMENT_QA_V1: PromptTemplate = PromptTemplate {
    id: "document-qa/v1",
    body: r#"You are a careful assistant answering questions about the user's uploaded documents.

Instructions:
1. Answer as completely and in as much detail as the context allows.
2. If the context does not contain the answer, answer from your general knowledge and state clearly that the uploaded documents do not cover it. Never refuse to answer.
3. If the question is "Summarize", write a structured summary of the context.
4. Format the answer in Markdown.

Context:
{context}

Question:
{question}

Answer:"#,
};

/// Resume review: job domains, skills to build, resume improvements
pub const RESUME_ANALYSIS_V1: PromptTemplate = PromptTemplate {
    id: "resume-analysis/v1",
    body: r#"You are an experienced career advisor reviewing a resume.

Instructions:
1. Identify the three job domains that best fit the skills in the resume.
2. For each domain, list further skills worth building and well-regarded courses for them.
3. Suggest concrete improvements to the resume itself.
4. Use bullet points and tables so the answer is easy to scan.
5. If the resume excerpt below is thin, still give your best assessment and say what information was missing.

Resume excerpt:
{context}

Focus:
{question}

Analysis:"#,
};

impl PromptTemplate {
    /// Fill both slots. Inserted text is never rescanned for slot markers.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.body.len() + context.len() + question.len());
        let mut rest = self.body;

        loop {
            let next_context = rest.find(CONTEXT_SLOT);
            let next_question = rest.find(QUESTION_SLOT);
            let (pos, slot, value) = match (next_context, next_question) {
                (Some(c), Some(q)) if c < q => (c, CONTEXT_SLOT, context),
                (Some(c), None) => (c, CONTEXT_SLOT, context),
                (_, Some(q)) => (q, QUESTION_SLOT, question),
                (None, None) => break,
            };
            out.push_str(&rest[..pos]);
            out.push_str(value);
            rest = &rest[pos + slot.len()..];
        }

        out.push_str(rest);
        out
    }
}

/// Selectable template profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptProfile {
    /// Detailed answers grounded in the documents
    #[default]
    DocumentQa,
    /// Career-oriented review of a resume
    ResumeAnalysis,
}

impl PromptProfile {
    /// Current template for this profile
    pub fn template(&self) -> PromptTemplate {
        match self {
            PromptProfile::DocumentQa => DOCUMENT_QA_V1,
            PromptProfile::ResumeAnalysis => RESUME_ANALYSIS_V1,
        }
    }

    /// Question used when the caller supplies none (resume flow)
    pub fn default_question(&self) -> &'static str {
        match self {
            PromptProfile::DocumentQa => "Summarize",
            PromptProfile::ResumeAnalysis => "Analyse this resume.",
        }
    }
}

impl fmt::Display for PromptProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template().id)
    }
}

impl FromStr for PromptProfile {
    type Err = String;

    /// Accepts the profile name (`resume_analysis`) or a template id (`resume-analysis/v1`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "document_qa" | "document-qa" | "document-qa/v1" => Ok(PromptProfile::DocumentQa),
            "resume_analysis" | "resume-analysis" | "resume-analysis/v1" => {
                Ok(PromptProfile::ResumeAnalysis)
            }
            other => Err(format!("unknown prompt profile '{}'", other)),
        }
    }
}

/// Prompt assembly from retrieval results
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts, best match first
    pub fn build_context(result: &RetrievalResult) -> String {
        if result.is_empty() {
            return EMPTY_CONTEXT.to_string();
        }

        result
            .hits
            .iter()
            .map(|hit| hit.chunk.text.trim())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    }

    /// Render the full prompt for a question
    pub fn build_prompt(profile: PromptProfile, result: &RetrievalResult, question: &str) -> String {
        profile
            .template()
            .render(&Self::build_context(result), question.trim())
    }
}
