//! Extraction instruction and response schema for the LLM call.
//!
//! Centralising the prompt and schema here serves two purposes:
//!
//! 1. **Single source of truth** — the backend handler and the storage
//!    trigger must send the model byte-identical instructions, or their
//!    outputs drift apart in ways no amount of normalization can repair.
//!
//! 2. **Testability** — unit tests can inspect the instruction and schema
//!    directly without a live model call, catching contract regressions.
//!
//! Callers can override the instruction via
//! [`crate::config::AnalysisConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

use crate::report::{FuelKey, FuelPriceMap};
use serde_json::{json, Value};

/// Fixed system instruction for report extraction.
///
/// The output contract is load-bearing: every numbered rule corresponds to a
/// deterministic expectation downstream (the normalizer assumes zero-default
/// lines carry a note; the metrics engine assumes margin/profit were never
/// trusted from the document). Edit with care.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a financial data extraction engine for fuel-station monthly reports.

Extract the figures from the provided report document and return them as structured data.

Follow these rules precisely:

1. OUTPUT SHAPE
   - Return ONE JSON object only, matching the provided schema exactly
   - Do NOT add properties that are not in the schema
   - Do NOT wrap the JSON in markdown fences or add commentary

2. UNITS AND CURRENCY
   - Every "total_revenue_zar" field is GROSS revenue in South African Rand
   - Fuel quantities are in liters; shop quantities are discrete units

3. FUEL PRODUCTS
   - Always return all three fuel keys: diesel_ex, vpower_95, vpower_diesel
   - If a fuel does not appear in the document, return zero revenue and zero
     liters for it and add a brief explanation to "notes"

4. WHAT TO IGNORE
   - IGNORE any PROFIT or MARGIN figures printed in the document entirely;
     only revenue and quantity figures are trusted
   - Leave margin_percent and profit_zar as null

5. LOW CONFIDENCE
   - If a numeric value is unreadable or ambiguous, return zero and add a
     brief explanatory note rather than guessing

6. SHOP SALES
   - Return one shop_lines entry per retail category row, preserving the
     order they appear in the document"#;

/// JSON schema constraining the model's structured output.
///
/// Mirrors [`crate::report::RawReport`]. `additionalProperties: false`
/// everywhere except fuel lines, where unknown keys are tolerated so the
/// normalizer's typo table can see and repair them.
pub fn response_schema() -> Value {
    let fuel_line = json!({
        "type": "object",
        "properties": {
            "total_revenue_zar": { "type": "number", "minimum": 0 },
            "quantity_liters": { "type": "number", "minimum": 0 },
            "margin_percent": { "type": ["number", "null"] },
            "profit_zar": { "type": ["number", "null"] }
        },
        "required": ["total_revenue_zar", "quantity_liters"]
    });

    let shop_line = json!({
        "type": "object",
        "properties": {
            "category": { "type": "string" },
            "total_revenue_zar": { "type": "number", "minimum": 0 },
            "quantity_units": { "type": "number", "minimum": 0 }
        },
        "required": ["category", "total_revenue_zar", "quantity_units"],
        "additionalProperties": false
    });

    let fuels = json!({
        "type": "object",
        "properties": {
            (FuelKey::DieselEx.as_str()): fuel_line.clone(),
            (FuelKey::Vpower95.as_str()): fuel_line.clone(),
            (FuelKey::VpowerDiesel.as_str()): fuel_line
        },
        "required": [
            FuelKey::DieselEx.as_str(),
            FuelKey::Vpower95.as_str(),
            FuelKey::VpowerDiesel.as_str()
        ],
        "additionalProperties": false
    });

    json!({
        "type": "object",
        "properties": {
            "period": {
                "type": "object",
                "properties": {
                    "month": { "type": "integer", "minimum": 1, "maximum": 12 },
                    "year": { "type": "integer" }
                },
                "required": ["month", "year"],
                "additionalProperties": false
            },
            "fuels": fuels,
            "shop_lines": { "type": "array", "items": shop_line.clone() },
            "forecast": {
                "type": ["object", "null"],
                "properties": {
                    "fuels": { "type": "object" },
                    "shop_lines": { "type": "array", "items": shop_line },
                    "method": { "type": "string" },
                    "assumptions": { "type": "string" }
                }
            },
            "notes": { "type": "string" }
        },
        "required": ["period", "fuels", "shop_lines", "notes"],
        "additionalProperties": false
    })
}

/// Optional caller context appended after the instruction.
///
/// Price inputs inform the *tone* of advisory text only — the instruction
/// explicitly forbids the model from deriving margins from them, and the
/// metrics engine recomputes margin/profit from these numbers afterwards
/// regardless of what the model says.
pub fn caller_context(prices: &FuelPriceMap) -> Option<String> {
    if prices.is_empty() {
        return None;
    }
    let mut ctx = String::from(
        "For context only (do NOT use these to fabricate margin or profit figures):\n",
    );
    for (key, p) in prices {
        ctx.push_str(&format!(
            "- {}: cost {:.2} ZAR/L, selling {:.2} ZAR/L\n",
            key.label(),
            p.cost_price_per_liter,
            p.selling_price_per_liter
        ));
    }
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FuelPriceInput;

    #[test]
    fn schema_requires_all_three_fuel_keys() {
        let schema = response_schema();
        let required = schema["properties"]["fuels"]["required"]
            .as_array()
            .unwrap();
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(names, vec!["diesel_ex", "vpower_95", "vpower_diesel"]);
    }

    #[test]
    fn schema_rejects_extra_top_level_properties() {
        let schema = response_schema();
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }

    #[test]
    fn prompt_pins_the_output_contract() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("ONE JSON object only"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("IGNORE any PROFIT or MARGIN"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("diesel_ex, vpower_95, vpower_diesel"));
    }

    #[test]
    fn caller_context_empty_for_no_prices() {
        assert!(caller_context(&FuelPriceMap::new()).is_none());
    }

    #[test]
    fn caller_context_lists_each_fuel() {
        let mut prices = FuelPriceMap::new();
        prices.insert(
            FuelKey::DieselEx,
            FuelPriceInput {
                cost_price_per_liter: 18.0,
                selling_price_per_liter: 20.0,
            },
        );
        let ctx = caller_context(&prices).unwrap();
        assert!(ctx.contains("Diesel Extra"));
        assert!(ctx.contains("18.00"));
        assert!(ctx.contains("do NOT"));
    }
}
