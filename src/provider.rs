//! LLM provider abstraction: one structured-output completion per request.
//!
//! The pipeline never talks HTTP to a model directly — it goes through
//! [`LlmProvider`], so tests can inject a canned implementation and the
//! orchestrator stays free of vendor details. Providers are constructed once
//! at startup and shared (`Arc<dyn LlmProvider>`); they hold only a reqwest
//! client and credentials, both safely shared across concurrent invocations.

use async_trait::async_trait;
use serde_json::Value;

/// Document content handed to the model: extracted text or the original
/// PDF bytes re-encoded for inline transmission.
#[derive(Debug, Clone)]
pub enum DocumentContent {
    /// Plain text extracted from the PDF, already capped in length.
    Text(String),
    /// Base64-encoded PDF bytes, for providers that read PDFs natively.
    Base64(String),
}

impl DocumentContent {
    /// Approximate payload size in characters, for logging.
    pub fn len(&self) -> usize {
        match self {
            DocumentContent::Text(s) | DocumentContent::Base64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One structured-output completion request.
///
/// `schema` constrains the model to the report shape; `context` is the
/// optional caller-supplied advisory context (price inputs, tone hints)
/// appended after the instruction.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub instruction: String,
    pub context: Option<String>,
    pub content: DocumentContent,
    pub temperature: f32,
    pub max_tokens: u32,
    pub schema: Value,
}

/// Trait for LLM providers — each backend implements this.
///
/// No streaming, no multi-turn state: the pipeline makes exactly one call
/// per invocation and treats the response as an opaque text blob to be
/// parsed by the invoker.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the completion request and return the model's response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Provider name for logs and error hints.
    fn name(&self) -> &'static str;
}

/// Transport-level and envelope-level provider failures.
///
/// Deliberately separate from [`crate::error::ReportError`]: a provider does
/// not know pipeline semantics. The invoker maps these onto the pipeline
/// taxonomy (`ModelUnavailable` for everything here — a broken envelope is a
/// transport-contract failure, not invalid *report* output).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response envelope: {0}")]
    Envelope(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_content_len() {
        assert_eq!(DocumentContent::Text("abcd".into()).len(), 4);
        assert!(DocumentContent::Text(String::new()).is_empty());
        assert!(!DocumentContent::Base64("JVBERi0=".into()).is_empty());
    }
}
