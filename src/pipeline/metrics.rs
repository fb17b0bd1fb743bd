//! Metrics engine: derived financial figures over the normalized record.
//!
//! Margin and profit are computed *only* from caller-supplied price inputs.
//! Whatever the extraction step put into `margin_percent` / `profit_zar` is
//! overwritten unconditionally — the instruction forbids the model from
//! inventing those figures, so any value arriving here is either null or a
//! hallucination, and neither is worth keeping.
//!
//! Pure given its inputs (record + optional price map); no external calls.
//! Division guards are explicit: a zero selling price or a zero fuel volume
//! produces zeros, never NaN or infinity.

use crate::report::{ExtractedReport, FuelKey, FuelPriceMap, UiMetrics};
use tracing::debug;

/// Annotate the record with per-fuel margin/profit, aggregate KPIs, and a
/// one-line summary. Consumes and returns the record; nothing is computed
/// in place on shared state.
pub fn compute_metrics(mut report: ExtractedReport, prices: &FuelPriceMap) -> ExtractedReport {
    // ── Per-fuel margin and profit ───────────────────────────────────────
    for key in FuelKey::ALL {
        let Some(line) = report.fuels.get_mut(&key) else {
            continue;
        };
        match prices.get(&key) {
            Some(p) => {
                let margin = margin_percent(p.cost_price_per_liter, p.selling_price_per_liter);
                let profit = line.total_revenue_zar * margin / 100.0;
                debug!("{key}: margin {margin:.2}%, profit R{profit:.2}");
                line.margin_percent = Some(margin);
                line.profit_zar = Some(profit);
            }
            None => {
                line.margin_percent = None;
                line.profit_zar = None;
            }
        }
    }

    // ── Aggregate KPIs ───────────────────────────────────────────────────
    let fuel_revenue: f64 = report.fuels.values().map(|l| l.total_revenue_zar).sum();
    let fuel_liters: f64 = report.fuels.values().map(|l| l.quantity_liters).sum();
    let shop_revenue: f64 = report.shop_lines.iter().map(|l| l.total_revenue_zar).sum();
    let fuel_margin: f64 = report
        .fuels
        .values()
        .map(|l| l.profit_zar.unwrap_or(0.0))
        .sum();

    let total_revenue = fuel_revenue + shop_revenue;
    let total_volume = fuel_liters;
    let shop_fuel_ratio = if total_volume > 0.0 {
        shop_revenue / total_volume
    } else {
        0.0
    };

    report.summary = Some(format!(
        "{:02}/{}: total revenue R{:.2} (fuel R{:.2} over {:.0} L, shop R{:.2}), \
         fuel profit R{:.2}, shop/fuel ratio {:.2} R/L",
        report.period.month,
        report.period.year,
        total_revenue,
        fuel_revenue,
        fuel_liters,
        shop_revenue,
        fuel_margin,
        shop_fuel_ratio,
    ));

    report.ui_metrics = Some(UiMetrics {
        total_revenue,
        total_profit: fuel_margin,
        total_volume,
        shop_fuel_ratio,
        fuel_margin,
        // Null until a real computation is defined upstream; the dashboard
        // contract expects the field present.
        shop_profit: None,
        changes: None,
        kpis: None,
    });

    report
}

/// `(sell − cost) / sell × 100`, with the denominator treated as 1 when the
/// selling price is zero or negative.
fn margin_percent(cost: f64, sell: f64) -> f64 {
    let denominator = if sell > 0.0 { sell } else { 1.0 };
    (sell - cost) / denominator * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FuelLine, FuelPriceInput, ReportPeriod, ShopLine};
    use std::collections::BTreeMap;

    fn report_with(revenue: f64, liters: f64) -> ExtractedReport {
        let mut fuels = BTreeMap::new();
        fuels.insert(
            FuelKey::DieselEx,
            FuelLine {
                total_revenue_zar: revenue,
                quantity_liters: liters,
                ..FuelLine::default()
            },
        );
        fuels.insert(FuelKey::Vpower95, FuelLine::zeroed());
        fuels.insert(FuelKey::VpowerDiesel, FuelLine::zeroed());
        ExtractedReport {
            period: ReportPeriod { month: 3, year: 2024 },
            fuels,
            shop_lines: vec![],
            forecast: None,
            notes: String::new(),
            ui_metrics: None,
            summary: None,
        }
    }

    fn price(cost: f64, sell: f64) -> FuelPriceInput {
        FuelPriceInput {
            cost_price_per_liter: cost,
            selling_price_per_liter: sell,
        }
    }

    #[test]
    fn margin_and_profit_from_price_input() {
        let mut prices = FuelPriceMap::new();
        prices.insert(FuelKey::DieselEx, price(18.0, 20.0));

        let report = compute_metrics(report_with(10_000.0, 500.0), &prices);
        let line = report.fuel(FuelKey::DieselEx);
        assert_eq!(line.margin_percent, Some(10.0));
        assert_eq!(line.profit_zar, Some(1_000.0));
    }

    #[test]
    fn no_price_input_means_null_margin_and_profit() {
        let report = compute_metrics(report_with(10_000.0, 500.0), &FuelPriceMap::new());
        let line = report.fuel(FuelKey::DieselEx);
        assert_eq!(line.margin_percent, None);
        assert_eq!(line.profit_zar, None);
    }

    #[test]
    fn extraction_supplied_margins_are_overwritten() {
        let mut r = report_with(10_000.0, 500.0);
        r.fuels.get_mut(&FuelKey::DieselEx).unwrap().margin_percent = Some(55.0);
        r.fuels.get_mut(&FuelKey::DieselEx).unwrap().profit_zar = Some(5_500.0);

        let report = compute_metrics(r, &FuelPriceMap::new());
        let line = report.fuel(FuelKey::DieselEx);
        assert_eq!(line.margin_percent, None, "model-invented margin must not survive");
        assert_eq!(line.profit_zar, None);
    }

    #[test]
    fn zero_selling_price_does_not_divide_by_zero() {
        let mut prices = FuelPriceMap::new();
        prices.insert(FuelKey::DieselEx, price(18.0, 0.0));

        let report = compute_metrics(report_with(10_000.0, 500.0), &prices);
        let margin = report.fuel(FuelKey::DieselEx).margin_percent.unwrap();
        assert!(margin.is_finite());
        assert_eq!(margin, -1_800.0); // (0 − 18) / 1 × 100
    }

    #[test]
    fn aggregates_sum_fuel_and_shop() {
        let mut r = report_with(15_000.0, 750.0);
        r.shop_lines = vec![
            ShopLine { category: "Bakery".into(), total_revenue_zar: 1_200.0, quantity_units: 30.0 },
            ShopLine { category: "Deli onsite prepared".into(), total_revenue_zar: 800.0, quantity_units: 10.0 },
        ];
        let report = compute_metrics(r, &FuelPriceMap::new());
        let m = report.ui_metrics.unwrap();
        assert_eq!(m.total_revenue, 17_000.0);
        assert_eq!(m.total_volume, 750.0);
        assert!((m.shop_fuel_ratio - 2_000.0 / 750.0).abs() < 1e-9);
        assert_eq!(m.fuel_margin, 0.0);
        assert_eq!(m.shop_profit, None);
        assert_eq!(m.changes, None);
        assert_eq!(m.kpis, None);
    }

    #[test]
    fn zero_volume_gives_zero_ratio() {
        let mut r = report_with(0.0, 0.0);
        r.shop_lines = vec![ShopLine {
            category: "Bakery".into(),
            total_revenue_zar: 500.0,
            quantity_units: 5.0,
        }];
        let report = compute_metrics(r, &FuelPriceMap::new());
        let m = report.ui_metrics.unwrap();
        assert_eq!(m.shop_fuel_ratio, 0.0);
        assert!(m.shop_fuel_ratio.is_finite());
    }

    #[test]
    fn summary_interpolates_totals() {
        let report = compute_metrics(report_with(15_000.0, 750.0), &FuelPriceMap::new());
        let summary = report.summary.unwrap();
        assert!(summary.contains("03/2024"));
        assert!(summary.contains("R15000.00"));
        assert!(summary.contains("750 L"));
    }

    #[test]
    fn fuel_margin_sums_per_fuel_profit() {
        let mut prices = FuelPriceMap::new();
        prices.insert(FuelKey::DieselEx, price(18.0, 20.0));
        prices.insert(FuelKey::Vpower95, price(19.0, 20.0));

        let mut r = report_with(10_000.0, 500.0);
        r.fuels.get_mut(&FuelKey::Vpower95).unwrap().total_revenue_zar = 4_000.0;

        let report = compute_metrics(r, &prices);
        let m = report.ui_metrics.unwrap();
        // diesel: 10% of 10000 = 1000; vpower_95: 5% of 4000 = 200
        assert!((m.fuel_margin - 1_200.0).abs() < 1e-9);
        assert_eq!(m.total_profit, m.fuel_margin);
    }
}
