//! Concrete LLM providers and environment-based construction.
//!
//! Providers are explicit, injected dependencies: the pipeline receives an
//! `Arc<dyn LlmProvider>` built exactly once at startup. There is no lazily
//! initialised process-wide client — scattering client construction across
//! call sites is how the extraction and normalization logic drifted apart in
//! the first place.

pub mod claude;
pub mod openai;

use crate::provider::{LlmError, LlmProvider};
use std::sync::Arc;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

/// Default model for a provider name. Model ids are vendor-specific, so the
/// fallback must be chosen per vendor, never at the call site.
fn default_model(name: &str) -> &'static str {
    match name {
        "anthropic" | "claude" => DEFAULT_ANTHROPIC_MODEL,
        _ => DEFAULT_OPENAI_MODEL,
    }
}

/// Create a provider by name, reading credentials from the environment.
///
/// Supported names: `"openai"` (plus any OpenAI-compatible endpoint via
/// `OPENAI_BASE_URL`), `"anthropic"`/`"claude"`. When `model` is `None` the
/// vendor's default model is used.
pub fn create_provider(
    name: &str,
    model: Option<&str>,
    timeout_secs: u64,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let model = model.unwrap_or_else(|| default_model(name));
    match name {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string());
            Ok(Arc::new(openai::OpenAiProvider::new(
                api_key,
                model.to_string(),
                base_url,
                timeout_secs,
            )?))
        }
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY")
                .map_err(|_| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Arc::new(claude::ClaudeProvider::new(
                api_key,
                model.to_string(),
                timeout_secs,
            )?))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{other}'"
        ))),
    }
}

/// Auto-detect a provider from the environment.
///
/// Checks `OPENAI_API_KEY` first, then `ANTHROPIC_API_KEY`. Users with
/// multiple keys who want the non-default provider should name it
/// explicitly instead of relying on detection order.
pub fn provider_from_env(
    model: Option<&str>,
    timeout_secs: u64,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model, timeout_secs);
    }
    if std::env::var("ANTHROPIC_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("anthropic", model, timeout_secs);
    }
    Err(LlmError::NotConfigured(
        "no LLM provider could be auto-detected; set OPENAI_API_KEY or ANTHROPIC_API_KEY".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_vendor_specific() {
        assert_eq!(default_model("openai"), DEFAULT_OPENAI_MODEL);
        assert_eq!(default_model("anthropic"), DEFAULT_ANTHROPIC_MODEL);
        assert_eq!(default_model("claude"), DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn unknown_provider_is_not_configured() {
        let err = create_provider("parrot", None, 1).err().unwrap();
        assert!(err.to_string().contains("parrot"));
    }
}
