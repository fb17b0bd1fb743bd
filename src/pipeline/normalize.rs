//! Normalizer: deterministic cleanup of the model's candidate record.
//!
//! ## Why is normalization necessary?
//!
//! Even schema-constrained extraction drifts in small, recurring ways that
//! are *plausible* from the model's perspective but wrong for the dashboard:
//!
//! - Misspelled field names copied from the source document's own typos
//!   (`quantity_lers` on the V-Power Diesel line is the canonical example)
//! - Shop categories the dashboard must never show (`Airtime`, `Cosmetics`,
//!   blank rows)
//! - A legacy category spelling (`"Deli Onsite"`) that downstream reporting
//!   standardised years ago
//! - Fuel keys omitted entirely when a product is absent from the document
//!
//! Every rule here is pure and table-driven: same candidate in, same record
//! out, no I/O. New typo patterns are added as table rows, not control flow.
//!
//! ## Rule order
//!
//! Typo correction runs before completeness synthesis so a repaired line is
//! never mistaken for a missing one; category rules are independent.

use crate::report::{ExtractedReport, FuelKey, FuelLine, RawReport, ShopLine};
use std::collections::BTreeMap;
use tracing::debug;

// ── Typo table ───────────────────────────────────────────────────────────

/// A known-bad field name on one fuel line and its canonical target.
struct TypoRule {
    fuel: FuelKey,
    bad_key: &'static str,
    canonical: &'static str,
}

/// Known misspellings observed in production extractions, scoped per fuel
/// key. Extend this table when a new pattern shows up; nothing else needs
/// to change.
const TYPO_RULES: &[TypoRule] = &[TypoRule {
    fuel: FuelKey::VpowerDiesel,
    bad_key: "quantity_lers",
    canonical: "quantity_liters",
}];

// ── Category rules ───────────────────────────────────────────────────────

/// Categories that never appear in the final output.
const EXCLUDED_CATEGORIES: &[&str] = &["Airtime", "Cosmetics", ""];

/// Legacy category spelling and its canonical rename. The rename is
/// idempotent: the canonical form is not itself in the table.
const CATEGORY_RENAMES: &[(&str, &str)] = &[("Deli Onsite", "Deli onsite prepared")];

// ── Entry point ──────────────────────────────────────────────────────────

/// Normalize a candidate record into the canonical report shape.
///
/// Applies, in order: field-typo correction, shop-category exclusion and
/// rename, and fuel-key completeness (zero lines with an explanatory note
/// for any key the model omitted).
pub fn normalize(raw: RawReport) -> ExtractedReport {
    let mut notes = raw.notes;
    let mut fuels: BTreeMap<FuelKey, FuelLine> = BTreeMap::new();

    for (key_str, mut line) in raw.fuels {
        let Some(key) = FuelKey::parse(&key_str) else {
            debug!("Dropping unrecognised fuel key '{key_str}'");
            continue;
        };
        apply_typo_rules(key, &mut line);
        fuels.insert(key, line);
    }

    for key in FuelKey::ALL {
        if !fuels.contains_key(&key) {
            push_note(
                &mut notes,
                &format!("{}: no data found in report; defaulted to zero.", key.label()),
            );
            fuels.insert(key, FuelLine::zeroed());
        }
    }

    let shop_lines = normalize_shop_lines(raw.shop_lines);

    ExtractedReport {
        period: raw.period,
        fuels,
        shop_lines,
        forecast: raw.forecast,
        notes,
        ui_metrics: None,
        summary: None,
    }
}

// ── Stage internals ──────────────────────────────────────────────────────

/// Move values from known-bad field names to their canonical fields, then
/// drop every unrecognised key so misspellings never reach the output.
///
/// A repaired value only lands when the canonical field is still unset —
/// if the model emitted both spellings, the canonical one wins.
fn apply_typo_rules(key: FuelKey, line: &mut FuelLine) {
    for rule in TYPO_RULES.iter().filter(|r| r.fuel == key) {
        if let Some(value) = line.extra.remove(rule.bad_key) {
            let Some(number) = value.as_f64() else {
                debug!("Typo key '{}' on {} held a non-number; dropped", rule.bad_key, key);
                continue;
            };
            debug!(
                "Corrected '{}' → '{}' on {} ({number})",
                rule.bad_key, rule.canonical, key
            );
            match rule.canonical {
                "quantity_liters" if line.quantity_liters == 0.0 => {
                    line.quantity_liters = number;
                }
                "total_revenue_zar" if line.total_revenue_zar == 0.0 => {
                    line.total_revenue_zar = number;
                }
                _ => {}
            }
        }
    }
    line.extra.clear();
}

/// Apply the exclusion set and rename table, preserving the order of
/// surviving entries. Both tables match on the trimmed category so padded
/// entries from sloppy extraction behave the same as clean ones.
fn normalize_shop_lines(lines: Vec<ShopLine>) -> Vec<ShopLine> {
    lines
        .into_iter()
        .filter(|l| !EXCLUDED_CATEGORIES.contains(&l.category.trim()))
        .map(|mut l| {
            let trimmed = l.category.trim();
            if let Some((_, canonical)) = CATEGORY_RENAMES
                .iter()
                .find(|(legacy, _)| *legacy == trimmed)
            {
                l.category = canonical.to_string();
            } else if trimmed.len() != l.category.len() {
                l.category = trimmed.to_string();
            }
            l
        })
        .collect()
}

fn push_note(notes: &mut String, note: &str) {
    if !notes.is_empty() && !notes.ends_with(' ') {
        notes.push(' ');
    }
    notes.push_str(note);
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportPeriod;
    use serde_json::json;

    fn raw_with_fuels(fuels: BTreeMap<String, FuelLine>) -> RawReport {
        RawReport {
            period: ReportPeriod { month: 3, year: 2024 },
            fuels,
            shop_lines: vec![],
            forecast: None,
            notes: String::new(),
        }
    }

    fn line(revenue: f64, liters: f64) -> FuelLine {
        FuelLine {
            total_revenue_zar: revenue,
            quantity_liters: liters,
            ..FuelLine::default()
        }
    }

    #[test]
    fn all_three_fuel_keys_always_present() {
        let report = normalize(raw_with_fuels(BTreeMap::new()));
        let keys: Vec<FuelKey> = report.fuels.keys().copied().collect();
        assert_eq!(keys, FuelKey::ALL.to_vec());
    }

    #[test]
    fn missing_keys_get_zero_lines_and_a_note() {
        let mut fuels = BTreeMap::new();
        fuels.insert("diesel_ex".to_string(), line(15000.0, 750.0));
        let report = normalize(raw_with_fuels(fuels));

        assert_eq!(report.fuel(FuelKey::DieselEx).total_revenue_zar, 15000.0);
        assert_eq!(report.fuel(FuelKey::Vpower95).total_revenue_zar, 0.0);
        assert_eq!(report.fuel(FuelKey::VpowerDiesel).quantity_liters, 0.0);
        assert!(report.notes.contains("V-Power 95"));
        assert!(report.notes.contains("V-Power Diesel"));
        assert!(report.notes.contains("defaulted to zero"));
    }

    #[test]
    fn quantity_lers_typo_is_corrected() {
        let mut bad_line = line(10000.0, 0.0);
        bad_line
            .extra
            .insert("quantity_lers".to_string(), json!(500.0));
        let mut fuels = BTreeMap::new();
        fuels.insert("vpower_diesel".to_string(), bad_line);

        let report = normalize(raw_with_fuels(fuels));
        let fixed = report.fuel(FuelKey::VpowerDiesel);
        assert_eq!(fixed.quantity_liters, 500.0);
        assert!(fixed.extra.is_empty(), "misspelled key must be removed");
    }

    #[test]
    fn typo_rule_is_scoped_to_its_fuel_key() {
        // Same bad key on diesel_ex has no rule; value is dropped, not moved.
        let mut bad_line = line(10000.0, 0.0);
        bad_line
            .extra
            .insert("quantity_lers".to_string(), json!(500.0));
        let mut fuels = BTreeMap::new();
        fuels.insert("diesel_ex".to_string(), bad_line);

        let report = normalize(raw_with_fuels(fuels));
        let l = report.fuel(FuelKey::DieselEx);
        assert_eq!(l.quantity_liters, 0.0);
        assert!(l.extra.is_empty());
    }

    #[test]
    fn canonical_value_wins_over_typo_value() {
        let mut both = line(10000.0, 600.0);
        both.extra.insert("quantity_lers".to_string(), json!(500.0));
        let mut fuels = BTreeMap::new();
        fuels.insert("vpower_diesel".to_string(), both);

        let report = normalize(raw_with_fuels(fuels));
        assert_eq!(report.fuel(FuelKey::VpowerDiesel).quantity_liters, 600.0);
    }

    #[test]
    fn excluded_categories_never_survive() {
        let mut raw = raw_with_fuels(BTreeMap::new());
        raw.shop_lines = vec![
            ShopLine { category: "Airtime".into(), total_revenue_zar: 100.0, quantity_units: 5.0 },
            ShopLine { category: "Bakery".into(), total_revenue_zar: 300.0, quantity_units: 20.0 },
            ShopLine { category: "Cosmetics".into(), total_revenue_zar: 50.0, quantity_units: 2.0 },
            ShopLine { category: "".into(), total_revenue_zar: 10.0, quantity_units: 1.0 },
        ];
        let report = normalize(raw);
        assert_eq!(report.shop_lines.len(), 1);
        assert_eq!(report.shop_lines[0].category, "Bakery");
    }

    #[test]
    fn deli_onsite_is_renamed() {
        let mut raw = raw_with_fuels(BTreeMap::new());
        raw.shop_lines = vec![ShopLine {
            category: "Deli Onsite".into(),
            total_revenue_zar: 2000.0,
            quantity_units: 40.0,
        }];
        let report = normalize(raw);
        assert_eq!(report.shop_lines[0].category, "Deli onsite prepared");
    }

    #[test]
    fn padded_categories_are_trimmed_before_matching() {
        let mut raw = raw_with_fuels(BTreeMap::new());
        raw.shop_lines = vec![
            ShopLine { category: " Deli Onsite ".into(), total_revenue_zar: 2000.0, quantity_units: 40.0 },
            ShopLine { category: " Airtime".into(), total_revenue_zar: 100.0, quantity_units: 5.0 },
            ShopLine { category: "Bakery ".into(), total_revenue_zar: 300.0, quantity_units: 20.0 },
        ];
        let report = normalize(raw);
        let cats: Vec<&str> = report.shop_lines.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(cats, vec!["Deli onsite prepared", "Bakery"]);
    }

    #[test]
    fn rename_is_idempotent() {
        let once = normalize_shop_lines(vec![ShopLine {
            category: "Deli Onsite".into(),
            total_revenue_zar: 1.0,
            quantity_units: 1.0,
        }]);
        let twice = normalize_shop_lines(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice[0].category, "Deli onsite prepared");
    }

    #[test]
    fn surviving_order_is_preserved() {
        let mut raw = raw_with_fuels(BTreeMap::new());
        raw.shop_lines = vec![
            ShopLine { category: "Bakery".into(), total_revenue_zar: 1.0, quantity_units: 1.0 },
            ShopLine { category: "Airtime".into(), total_revenue_zar: 1.0, quantity_units: 1.0 },
            ShopLine { category: "Beverages".into(), total_revenue_zar: 1.0, quantity_units: 1.0 },
            ShopLine { category: "Snacks".into(), total_revenue_zar: 1.0, quantity_units: 1.0 },
        ];
        let report = normalize(raw);
        let cats: Vec<&str> = report.shop_lines.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(cats, vec!["Bakery", "Beverages", "Snacks"]);
    }

    #[test]
    fn normalize_is_deterministic() {
        let mut fuels = BTreeMap::new();
        fuels.insert("diesel_ex".to_string(), line(15000.0, 750.0));
        let a = normalize(raw_with_fuels(fuels.clone()));
        let b = normalize(raw_with_fuels(fuels));
        assert_eq!(a, b);
    }

    #[test]
    fn existing_notes_are_kept_in_front() {
        let mut fuels = BTreeMap::new();
        fuels.insert("diesel_ex".to_string(), line(1.0, 1.0));
        fuels.insert("vpower_95".to_string(), line(0.0, 0.0));
        fuels.insert("vpower_diesel".to_string(), line(0.0, 0.0));
        let mut raw = raw_with_fuels(fuels);
        raw.notes = "Scanned copy, low legibility.".to_string();
        let report = normalize(raw);
        assert!(report.notes.starts_with("Scanned copy"));
    }
}
