//! Data model for extracted fuel-station reports.
//!
//! Two report shapes exist on purpose:
//!
//! * [`RawReport`] — what the model actually returned, parsed leniently.
//!   Fuel lines are keyed by *string* because the model may emit misspelled
//!   field names inside a line (captured in [`FuelLine::extra`]) and the
//!   normalizer needs to see them to fix them.
//!
//! * [`ExtractedReport`] — the normalized record handed to callers. Fuel
//!   lines are keyed by the closed [`FuelKey`] enum, so the type system
//!   guarantees no fourth fuel product can sneak into the output.
//!
//! All revenue figures are gross revenue in ZAR; fuel quantities are liters,
//! shop quantities discrete units. The record is created once per pipeline
//! invocation and never mutated after it is returned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Fuel keys ────────────────────────────────────────────────────────────

/// The three fixed fuel products every report must cover.
///
/// The set is closed by contract: a normalized report contains exactly these
/// keys, synthesizing zero-valued lines for any the source document omits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FuelKey {
    #[serde(rename = "diesel_ex")]
    DieselEx,
    #[serde(rename = "vpower_95")]
    Vpower95,
    #[serde(rename = "vpower_diesel")]
    VpowerDiesel,
}

impl FuelKey {
    /// All three keys, in canonical output order.
    pub const ALL: [FuelKey; 3] = [FuelKey::DieselEx, FuelKey::Vpower95, FuelKey::VpowerDiesel];

    /// The wire name used in JSON and in the extraction schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelKey::DieselEx => "diesel_ex",
            FuelKey::Vpower95 => "vpower_95",
            FuelKey::VpowerDiesel => "vpower_diesel",
        }
    }

    /// Human-readable product name for notes and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            FuelKey::DieselEx => "Diesel Extra",
            FuelKey::Vpower95 => "V-Power 95",
            FuelKey::VpowerDiesel => "V-Power Diesel",
        }
    }

    /// Parse a wire name back into a key.
    pub fn parse(s: &str) -> Option<FuelKey> {
        FuelKey::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for FuelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Report lines ─────────────────────────────────────────────────────────

/// Reporting period, required on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportPeriod {
    /// Calendar month, 1–12.
    pub month: u8,
    pub year: i32,
}

/// One fuel product's monthly figures.
///
/// `margin_percent` and `profit_zar` are *derived* fields: the extraction
/// instruction forbids the model from inventing them, and the metrics engine
/// overwrites them unconditionally. They are `None` unless the caller
/// supplied price inputs for the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FuelLine {
    #[serde(default)]
    pub total_revenue_zar: f64,
    #[serde(default)]
    pub quantity_liters: f64,
    #[serde(default)]
    pub margin_percent: Option<f64>,
    #[serde(default)]
    pub profit_zar: Option<f64>,
    /// Unrecognised keys the model emitted on this line. Fed to the
    /// normalizer's typo table, then dropped from the output.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FuelLine {
    /// A zero line for a fuel the source document does not mention.
    pub fn zeroed() -> Self {
        FuelLine::default()
    }
}

/// A non-fuel retail sales category row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopLine {
    pub category: String,
    #[serde(default)]
    pub total_revenue_zar: f64,
    #[serde(default)]
    pub quantity_units: f64,
}

/// Optional forward projection. Free text, passed through unvalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ForecastBlock {
    #[serde(default)]
    pub fuels: BTreeMap<String, FuelLine>,
    #[serde(default)]
    pub shop_lines: Vec<ShopLine>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub assumptions: String,
}

/// Caller-supplied cost/selling prices for one fuel key.
///
/// Never produced by extraction; consumed only by the metrics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelPriceInput {
    pub cost_price_per_liter: f64,
    pub selling_price_per_liter: f64,
}

/// Price inputs keyed by fuel product.
pub type FuelPriceMap = BTreeMap<FuelKey, FuelPriceInput>;

// ── Derived metrics ──────────────────────────────────────────────────────

/// Dashboard KPIs, computed solely from the normalized record.
///
/// `shop_profit`, `changes` and `kpis` are serialized as explicit nulls:
/// the upstream dashboard contract keeps them "null until a real
/// computation is defined", so hiding the fields would break consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMetrics {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_volume: f64,
    pub shop_fuel_ratio: f64,
    pub fuel_margin: f64,
    pub shop_profit: Option<f64>,
    pub changes: Option<serde_json::Value>,
    pub kpis: Option<serde_json::Value>,
}

// ── Report records ───────────────────────────────────────────────────────

/// The model's candidate record, parsed leniently before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawReport {
    pub period: ReportPeriod,
    /// String-keyed so misspellings and stray keys survive long enough for
    /// the normalizer to see them.
    pub fuels: BTreeMap<String, FuelLine>,
    #[serde(default)]
    pub shop_lines: Vec<ShopLine>,
    #[serde(default)]
    pub forecast: Option<ForecastBlock>,
    #[serde(default)]
    pub notes: String,
}

/// The normalized, metrics-annotated record returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReport {
    pub period: ReportPeriod,
    /// Always contains exactly the three [`FuelKey`] entries.
    pub fuels: BTreeMap<FuelKey, FuelLine>,
    pub shop_lines: Vec<ShopLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastBlock>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_metrics: Option<UiMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ExtractedReport {
    /// Fuel line for a key. Normalized reports always contain all three.
    pub fn fuel(&self, key: FuelKey) -> &FuelLine {
        // BTreeMap lookup cannot fail post-normalization; the static zero
        // line keeps this accessor infallible for callers.
        static ZERO: FuelLine = FuelLine {
            total_revenue_zar: 0.0,
            quantity_liters: 0.0,
            margin_percent: None,
            profit_zar: None,
            extra: BTreeMap::new(),
        };
        self.fuels.get(&key).unwrap_or(&ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_key_wire_names_round_trip() {
        for key in FuelKey::ALL {
            assert_eq!(FuelKey::parse(key.as_str()), Some(key));
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
        assert_eq!(FuelKey::parse("petrol_93"), None);
    }

    #[test]
    fn fuel_map_serializes_with_wire_keys() {
        let mut fuels = BTreeMap::new();
        fuels.insert(FuelKey::Vpower95, FuelLine::zeroed());
        let json = serde_json::to_value(&fuels).unwrap();
        assert!(json.get("vpower_95").is_some());
    }

    #[test]
    fn fuel_line_captures_unknown_keys() {
        let line: FuelLine = serde_json::from_str(
            r#"{"total_revenue_zar": 100.0, "quantity_lers": 50.0}"#,
        )
        .unwrap();
        assert_eq!(line.total_revenue_zar, 100.0);
        assert_eq!(line.quantity_liters, 0.0);
        assert_eq!(line.extra.get("quantity_lers"), Some(&serde_json::json!(50.0)));
    }

    #[test]
    fn fuel_line_defaults_missing_fields_to_zero() {
        let line: FuelLine = serde_json::from_str("{}").unwrap();
        assert_eq!(line.total_revenue_zar, 0.0);
        assert_eq!(line.quantity_liters, 0.0);
        assert!(line.margin_percent.is_none());
        assert!(line.profit_zar.is_none());
    }

    #[test]
    fn ui_metrics_nulls_are_explicit() {
        let m = UiMetrics {
            total_revenue: 1.0,
            total_profit: 0.0,
            total_volume: 2.0,
            shop_fuel_ratio: 0.5,
            fuel_margin: 0.0,
            shop_profit: None,
            changes: None,
            kpis: None,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("shop_profit").unwrap().is_null());
        assert!(json.get("changes").unwrap().is_null());
        assert!(json.get("kpis").unwrap().is_null());
    }

    #[test]
    fn raw_report_parses_minimal_candidate() {
        let raw: RawReport = serde_json::from_str(
            r#"{
                "period": {"month": 3, "year": 2024},
                "fuels": {"diesel_ex": {"total_revenue_zar": 15000, "quantity_liters": 750}}
            }"#,
        )
        .unwrap();
        assert_eq!(raw.period.month, 3);
        assert_eq!(raw.fuels.len(), 1);
        assert!(raw.shop_lines.is_empty());
        assert!(raw.notes.is_empty());
    }
}
