//! OpenAI (and OpenAI-compatible) chat-completions provider.
//!
//! Structured output uses the `response_format: json_schema` mechanism with
//! `strict` disabled: fuel lines intentionally tolerate unknown keys so the
//! normalizer's typo table can see misspelled field names, and strict mode
//! would reject exactly those responses before we ever got to repair them.
//!
//! Base64 document content is inlined into the user message as text — the
//! chat-completions endpoint has no PDF attachment type. Callers wanting
//! native PDF reading should use the Anthropic provider with binary mode.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::provider::{CompletionRequest, DocumentContent, LlmError, LlmProvider};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut system = request.instruction.clone();
        if let Some(ref ctx) = request.context {
            system.push_str("\n\n");
            system.push_str(ctx);
        }

        let user_content = match &request.content {
            DocumentContent::Text(text) => format!("Report document text:\n\n{text}"),
            DocumentContent::Base64(b64) => {
                format!("Report document (base64-encoded PDF):\n\n{b64}")
            }
        };

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user_content }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "extracted_report",
                    "schema": request.schema
                }
            }
        });

        debug!("OpenAI request to {} ({} chars)", url, request.content.len());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Envelope("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
