use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::data::aggregate::{distinct_count, group_sum, monthly_series, total};
use crate::data::filter::FilteredView;
use crate::data::model::{Dimension, IdKey, Measure, YearMonth};

/// Measures broken down by dimension, in display order.
pub const BREAKDOWN_MEASURES: [Measure; 3] = [Measure::Sales, Measure::Quantity, Measure::Profit];

/// Dimensions each measure is broken down by, in display order.
pub const BREAKDOWN_DIMENSIONS: [Dimension; 3] =
    [Dimension::Segment, Dimension::Region, Dimension::Category];

// ---------------------------------------------------------------------------
// Dashboard outputs
// ---------------------------------------------------------------------------

/// Headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub customers: usize,
    pub orders: usize,
    pub products_sold: i64,
    pub total_sales: f64,
    pub total_profit: f64,
}

/// One measure summed per value of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub measure: Measure,
    pub dimension: Dimension,
    pub groups: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub value: f64,
}

/// Everything the dashboard draws for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub records: usize,
    pub metrics: Metrics,
    pub breakdowns: Vec<Breakdown>,
    pub monthly_sales: Vec<MonthlyPoint>,
    pub monthly_profit: Vec<MonthlyPoint>,
}

fn series(view: &FilteredView<'_>, measure: Measure) -> Vec<MonthlyPoint> {
    monthly_series(view, measure)
        .into_iter()
        .map(|(month, value)| MonthlyPoint { month, value })
        .collect()
}

impl DashboardSummary {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        let metrics = Metrics {
            customers: distinct_count(view, IdKey::CustomerId),
            orders: distinct_count(view, IdKey::OrderId),
            products_sold: total(view, Measure::Quantity) as i64,
            total_sales: total(view, Measure::Sales),
            total_profit: total(view, Measure::Profit),
        };

        let breakdowns = BREAKDOWN_MEASURES
            .into_iter()
            .flat_map(|measure| {
                BREAKDOWN_DIMENSIONS.into_iter().map(move |dimension| Breakdown {
                    measure,
                    dimension,
                    groups: group_sum(view, dimension, measure),
                })
            })
            .collect();

        DashboardSummary {
            records: view.len(),
            metrics,
            breakdowns,
            monthly_sales: series(view, Measure::Sales),
            monthly_profit: series(view, Measure::Profit),
        }
    }

    pub fn breakdown(&self, measure: Measure, dimension: Dimension) -> Option<&Breakdown> {
        self.breakdowns
            .iter()
            .find(|b| b.measure == measure && b.dimension == dimension)
    }

    /// Plain-text report; money is prefixed with `currency`.
    pub fn render_text(&self, currency: &str) -> String {
        let money = |v: f64| format!("{currency} {}", format_thousands(v, 2));
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "Records:        {}", format_thousands(self.records as f64, 0));
        let _ = writeln!(out, "Customers:      {}", format_thousands(self.metrics.customers as f64, 0));
        let _ = writeln!(out, "Orders:         {}", format_thousands(self.metrics.orders as f64, 0));
        let _ = writeln!(out, "Products sold:  {}", format_thousands(self.metrics.products_sold as f64, 0));
        let _ = writeln!(out, "Total sales:    {}", money(self.metrics.total_sales));
        let _ = writeln!(out, "Total profit:   {}", money(self.metrics.total_profit));

        for (title, points) in [
            ("Sales per month", &self.monthly_sales),
            ("Profit per month", &self.monthly_profit),
        ] {
            let _ = writeln!(out, "\n{title}");
            if points.is_empty() {
                let _ = writeln!(out, "  (no data)");
            }
            for p in points {
                let _ = writeln!(out, "  {}  {:>18}", p.month, money(p.value));
            }
        }

        for b in &self.breakdowns {
            let _ = writeln!(out, "\n{} by {}", b.measure, b.dimension);
            if b.groups.is_empty() {
                let _ = writeln!(out, "  (no data)");
            }
            for (label, value) in &b.groups {
                let shown = match b.measure {
                    Measure::Quantity => format_thousands(*value, 0),
                    Measure::Sales | Measure::Profit => money(*value),
                };
                let _ = writeln!(out, "  {label:<16} {shown:>18}");
            }
        }
        out
    }
}

/// Format with `decimals` places and comma thousands separators
/// (`1234567.891` → `"1,234,567.89"`).
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, init_criteria};
    use crate::data::model::tests::west_east_dataset;

    #[test]
    fn formats_thousands() {
        assert_eq!(format_thousands(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_thousands(999.0, 0), "999");
        assert_eq!(format_thousands(1000.0, 0), "1,000");
        assert_eq!(format_thousands(-12345.5, 2), "-12,345.50");
        assert_eq!(format_thousands(-0.001, 2), "0.00");
        assert_eq!(format_thousands(0.0, 2), "0.00");
    }

    #[test]
    fn summary_has_nine_breakdowns_in_display_order() {
        let ds = west_east_dataset();
        let summary = DashboardSummary::compute(&FilteredView::all(&ds));

        assert_eq!(summary.breakdowns.len(), 9);
        assert_eq!(summary.breakdowns[0].measure, Measure::Sales);
        assert_eq!(summary.breakdowns[0].dimension, Dimension::Segment);
        assert_eq!(summary.breakdowns[8].measure, Measure::Profit);
        assert_eq!(summary.breakdowns[8].dimension, Dimension::Category);

        let by_region = summary.breakdown(Measure::Sales, Dimension::Region).unwrap();
        assert_eq!(by_region.groups.get("West"), Some(&150.0));
        assert_eq!(by_region.groups.get("East"), Some(&200.0));
    }

    #[test]
    fn summary_metrics_for_west() {
        let ds = west_east_dataset();
        let view = apply(&ds, &init_criteria(&ds).with_selection(Dimension::Region, ["West"]));
        let summary = DashboardSummary::compute(&view);

        assert_eq!(summary.records, 2);
        assert_eq!(summary.metrics.orders, 2);
        assert_eq!(summary.metrics.customers, 2);
        assert_eq!(summary.metrics.products_sold, 2);
        assert_eq!(summary.metrics.total_sales, 150.0);
        assert_eq!(summary.monthly_sales.len(), 2);
        assert_eq!(summary.monthly_sales[1].month, YearMonth::new(2023, 2));
    }

    #[test]
    fn serializes_months_as_text() {
        let ds = west_east_dataset();
        let summary = DashboardSummary::compute(&FilteredView::all(&ds));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["monthly_sales"][0]["month"], "2023-01");
        assert_eq!(json["breakdowns"][3]["measure"], "quantity");
        assert_eq!(json["breakdowns"][3]["dimension"], "segment");
    }

    #[test]
    fn renders_text_with_currency() {
        let ds = west_east_dataset();
        let text = DashboardSummary::compute(&FilteredView::all(&ds)).render_text("Rp");
        assert!(text.contains("Total sales:    Rp 350.00"), "{text}");
        assert!(text.contains("sales by region"));
        assert!(text.contains("2023-02"));
    }
}
