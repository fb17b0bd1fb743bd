//! Extraction invoker: one LLM completion per pipeline invocation.
//!
//! This stage is intentionally thin — the instruction and schema live in
//! [`crate::prompts`], vendor details live behind [`LlmProvider`], and all
//! deterministic cleanup belongs to the normalizer. What remains here is the
//! call itself plus candidate validation.
//!
//! ## Validation boundary
//!
//! The candidate must parse as JSON and contain all three mandatory fuel
//! keys; anything less is [`ReportError::InvalidModelOutput`] carrying the
//! raw model text for diagnosis. Defaults are never substituted here — a
//! response that flunks these checks is fundamentally malformed, and
//! papering over it would hide model regressions. (Zero synthesis for a
//! *well-formed* candidate is the normalizer's job.)
//!
//! No retries: the pipeline is invoked synchronously per user action, so a
//! caller wanting resilience retries the whole invocation.

use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::prompts::{caller_context, response_schema, EXTRACTION_SYSTEM_PROMPT};
use crate::provider::{CompletionRequest, DocumentContent, LlmError, LlmProvider};
use crate::report::{FuelKey, FuelPriceMap, RawReport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Run the single extraction completion and return the validated candidate.
pub async fn invoke_extraction(
    provider: &Arc<dyn LlmProvider>,
    content: DocumentContent,
    prices: &FuelPriceMap,
    config: &AnalysisConfig,
) -> Result<RawReport, ReportError> {
    let start = Instant::now();

    let instruction = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| EXTRACTION_SYSTEM_PROMPT.to_string());

    let request = CompletionRequest {
        instruction,
        context: caller_context(prices),
        content,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        schema: response_schema(),
    };

    let text = provider
        .complete(request)
        .await
        .map_err(map_provider_error)?;

    debug!(
        "Model responded with {} chars in {:?}",
        text.len(),
        start.elapsed()
    );

    validate_candidate(&text)
}

/// Parse and validate the raw model text into a candidate record.
///
/// Pure, so the whole validation boundary is unit-testable without a
/// provider.
pub fn validate_candidate(text: &str) -> Result<RawReport, ReportError> {
    let stripped = strip_json_fences(text);

    let value: serde_json::Value =
        serde_json::from_str(stripped.trim()).map_err(|e| ReportError::InvalidModelOutput {
            detail: format!("response is not parseable JSON: {e}"),
            raw: text.to_string(),
        })?;

    let raw: RawReport =
        serde_json::from_value(value).map_err(|e| ReportError::InvalidModelOutput {
            detail: format!("response does not match the report shape: {e}"),
            raw: text.to_string(),
        })?;

    for key in FuelKey::ALL {
        if !raw.fuels.contains_key(key.as_str()) {
            warn!("Model omitted mandatory fuel key '{key}'");
            return Err(ReportError::InvalidModelOutput {
                detail: format!("missing mandatory fuel key '{key}'"),
                raw: text.to_string(),
            });
        }
    }

    Ok(raw)
}

// Models occasionally wrap their JSON in markdown fences despite the
// instruction saying not to.
static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\n(.*)\n```\s*$").unwrap());

fn strip_json_fences(input: &str) -> String {
    if let Some(caps) = RE_JSON_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn map_provider_error(e: LlmError) -> ReportError {
    match e {
        LlmError::NotConfigured(hint) => ReportError::ProviderNotConfigured {
            provider: "llm".to_string(),
            hint,
        },
        other => ReportError::ModelUnavailable {
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"{
        "period": {"month": 3, "year": 2024},
        "fuels": {
            "diesel_ex": {"total_revenue_zar": 15000, "quantity_liters": 750},
            "vpower_95": {"total_revenue_zar": 0, "quantity_liters": 0},
            "vpower_diesel": {"total_revenue_zar": 0, "quantity_liters": 0}
        },
        "shop_lines": [],
        "notes": ""
    }"#;

    #[test]
    fn complete_candidate_validates() {
        let raw = validate_candidate(COMPLETE).unwrap();
        assert_eq!(raw.period.year, 2024);
        assert_eq!(raw.fuels.len(), 3);
    }

    #[test]
    fn fenced_candidate_validates() {
        let fenced = format!("```json\n{COMPLETE}\n```");
        assert!(validate_candidate(&fenced).is_ok());
    }

    #[test]
    fn non_json_is_invalid_output_with_raw() {
        let err = validate_candidate("I could not read the document, sorry!").unwrap_err();
        assert_eq!(err.kind(), "invalid_model_output");
        assert_eq!(err.raw_output(), Some("I could not read the document, sorry!"));
    }

    #[test]
    fn missing_fuel_key_is_invalid_output() {
        let text = r#"{
            "period": {"month": 1, "year": 2024},
            "fuels": {
                "diesel_ex": {"total_revenue_zar": 1, "quantity_liters": 1},
                "vpower_95": {"total_revenue_zar": 0, "quantity_liters": 0}
            },
            "shop_lines": [],
            "notes": ""
        }"#;
        let err = validate_candidate(text).unwrap_err();
        assert_eq!(err.kind(), "invalid_model_output");
        assert!(err.to_string().contains("vpower_diesel"));
    }

    #[test]
    fn wrong_shape_is_invalid_output() {
        let err = validate_candidate(r#"{"period": "March 2024"}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_model_output");
        assert!(err.to_string().contains("report shape"));
    }

    #[test]
    fn fence_stripping_passthrough() {
        assert_eq!(strip_json_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
