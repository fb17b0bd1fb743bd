//! Claude (Anthropic API) provider.
//!
//! The Messages API has no `response_format` parameter, so the response
//! schema is appended to the system instruction as an explicit contract.
//! The invoker's fence-stripping and validation absorb the residual risk of
//! the model decorating its JSON.
//!
//! Binary mode maps to a native `document` content block: Claude reads the
//! PDF itself, which preserves table layout that plain text extraction
//! flattens.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::provider::{CompletionRequest, DocumentContent, LlmError, LlmProvider};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut system = request.instruction.clone();
        system.push_str("\n\nThe JSON object must conform to this JSON schema:\n");
        system.push_str(&request.schema.to_string());
        if let Some(ref ctx) = request.context {
            system.push_str("\n\n");
            system.push_str(ctx);
        }

        let user_content = match &request.content {
            DocumentContent::Text(text) => json!([
                { "type": "text", "text": format!("Report document text:\n\n{text}") }
            ]),
            DocumentContent::Base64(b64) => json!([
                {
                    "type": "document",
                    "source": {
                        "type": "base64",
                        "media_type": "application/pdf",
                        "data": b64
                    }
                },
                { "type": "text", "text": "Extract the report figures from this document." }
            ]),
        };

        let body = json!({
            "model": self.model,
            "system": system,
            "messages": [ { "role": "user", "content": user_content } ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        debug!("Claude request ({} chars)", request.content.len());

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
        let content = resp["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::Envelope("missing content[0].text".into()))?
            .to_string();

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
