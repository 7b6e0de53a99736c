use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Field names – typed handles for the columns the engine reads
// ---------------------------------------------------------------------------

/// Raised when a column name does not name a known dimension, measure or key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unknown dimension '{0}' (expected region, segment, ship_mode or category)")]
    UnknownDimension(String),
    #[error("unknown measure '{0}' (expected sales, profit or quantity)")]
    UnknownMeasure(String),
    #[error("unknown identifier column '{0}' (expected order_id or customer_id)")]
    UnknownKey(String),
}

/// A categorical column used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Region,
    Segment,
    ShipMode,
    Category,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Region,
        Dimension::Segment,
        Dimension::ShipMode,
        Dimension::Category,
    ];

    /// Normalized column name.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Region => "region",
            Dimension::Segment => "segment",
            Dimension::ShipMode => "ship_mode",
            Dimension::Category => "category",
        }
    }

    pub fn value(self, record: &Record) -> &str {
        match self {
            Dimension::Region => &record.region,
            Dimension::Segment => &record.segment,
            Dimension::ShipMode => &record.ship_mode,
            Dimension::Category => &record.category,
        }
    }
}

/// A numeric column subject to aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Sales,
    Profit,
    Quantity,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::Sales, Measure::Profit, Measure::Quantity];

    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Sales => "sales",
            Measure::Profit => "profit",
            Measure::Quantity => "quantity",
        }
    }

    pub fn value(self, record: &Record) -> f64 {
        match self {
            Measure::Sales => record.sales,
            Measure::Profit => record.profit,
            Measure::Quantity => record.quantity as f64,
        }
    }
}

/// An identifier column counted with distinct-count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKey {
    OrderId,
    CustomerId,
}

impl IdKey {
    pub fn as_str(self) -> &'static str {
        match self {
            IdKey::OrderId => "order_id",
            IdKey::CustomerId => "customer_id",
        }
    }

    pub fn value(self, record: &Record) -> &str {
        match self {
            IdKey::OrderId => &record.order_id,
            IdKey::CustomerId => &record.customer_id,
        }
    }
}

// Names are accepted in any spelling that normalizes to the column name,
// so "Ship Mode", "ship_mode" and "SHIP MODE" all parse.

impl FromStr for Dimension {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = normalize_column_name(s);
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| FieldError::UnknownDimension(s.to_string()))
    }
}

impl FromStr for Measure {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = normalize_column_name(s);
        Measure::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| FieldError::UnknownMeasure(s.to_string()))
    }
}

impl FromStr for IdKey {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_column_name(s).as_str() {
            "order_id" => Ok(IdKey::OrderId),
            "customer_id" => Ok(IdKey::CustomerId),
            _ => Err(FieldError::UnknownKey(s.to_string())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase a header and replace spaces with underscores
/// (`"Order Date"` → `"order_date"`).
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

// ---------------------------------------------------------------------------
// YearMonth – calendar month key for time series
// ---------------------------------------------------------------------------

/// A calendar month. Field order makes the derived `Ord` chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        YearMonth { year, month }
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Record – one sales line
// ---------------------------------------------------------------------------

/// One transaction line of the cleaned sales dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Not unique per record: an order spans several lines.
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub ship_date: NaiveDate,
    pub region: String,
    pub segment: String,
    pub ship_mode: String,
    pub category: String,
    pub sales: f64,
    /// Signed; losses are negative.
    pub profit: f64,
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed filter options.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All records, in file order.
    pub records: Vec<Record>,
    /// For each dimension the sorted set of observed values.
    pub unique_values: BTreeMap<Dimension, BTreeSet<String>>,
    /// Earliest and latest order date, `None` for an empty dataset.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

impl Dataset {
    /// Build the per-dimension indices from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<Dimension, BTreeSet<String>> = Dimension::ALL
            .into_iter()
            .map(|d| (d, BTreeSet::new()))
            .collect();
        let mut date_bounds: Option<(NaiveDate, NaiveDate)> = None;

        for rec in &records {
            for dim in Dimension::ALL {
                if let Some(values) = unique_values.get_mut(&dim) {
                    if !values.contains(dim.value(rec)) {
                        values.insert(dim.value(rec).to_string());
                    }
                }
            }
            date_bounds = Some(match date_bounds {
                None => (rec.order_date, rec.order_date),
                Some((lo, hi)) => (lo.min(rec.order_date), hi.max(rec.order_date)),
            });
        }

        Dataset {
            records,
            unique_values,
            date_bounds,
        }
    }

    /// Observed values of a dimension; empty for an empty dataset.
    pub fn options(&self, dimension: Dimension) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        self.unique_values.get(&dimension).unwrap_or(&EMPTY)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub(crate) fn record(order_id: &str, day: NaiveDate, region: &str, sales: f64) -> Record {
        Record {
            order_id: order_id.to_string(),
            customer_id: format!("C-{order_id}"),
            order_date: day,
            ship_date: day,
            region: region.to_string(),
            segment: "Consumer".to_string(),
            ship_mode: "Standard Class".to_string(),
            category: "Furniture".to_string(),
            sales,
            profit: sales / 10.0,
            quantity: 1,
        }
    }

    /// The three-line dataset used across the engine tests.
    pub(crate) fn west_east_dataset() -> Dataset {
        Dataset::from_records(vec![
            record("O-1", date(2023, 1, 15), "West", 100.0),
            record("O-2", date(2023, 2, 10), "East", 200.0),
            record("O-3", date(2023, 2, 20), "West", 50.0),
        ])
    }

    #[test]
    fn normalizes_header_names() {
        assert_eq!(normalize_column_name("Order Date"), "order_date");
        assert_eq!(normalize_column_name(" Ship Mode "), "ship_mode");
        assert_eq!(normalize_column_name("sales"), "sales");
    }

    #[test]
    fn parses_field_names_in_any_spelling() {
        assert_eq!("Ship Mode".parse::<Dimension>(), Ok(Dimension::ShipMode));
        assert_eq!("PROFIT".parse::<Measure>(), Ok(Measure::Profit));
        assert_eq!("Customer ID".parse::<IdKey>(), Ok(IdKey::CustomerId));
        assert_eq!(
            "country".parse::<Dimension>(),
            Err(FieldError::UnknownDimension("country".to_string()))
        );
    }

    #[test]
    fn year_month_orders_chronologically() {
        let mut months = vec![
            YearMonth::new(2024, 1),
            YearMonth::new(2023, 12),
            YearMonth::new(2023, 2),
        ];
        months.sort();
        assert_eq!(
            months,
            vec![
                YearMonth::new(2023, 2),
                YearMonth::new(2023, 12),
                YearMonth::new(2024, 1)
            ]
        );
        assert_eq!(YearMonth::of(date(2023, 2, 20)).to_string(), "2023-02");
    }

    #[test]
    fn indexes_options_and_date_bounds() {
        let ds = west_east_dataset();
        assert_eq!(ds.len(), 3);
        let regions: Vec<&str> = ds.options(Dimension::Region).iter().map(String::as_str).collect();
        assert_eq!(regions, vec!["East", "West"]);
        assert_eq!(ds.options(Dimension::Segment).len(), 1);
        assert_eq!(ds.date_bounds, Some((date(2023, 1, 15), date(2023, 2, 20))));
    }

    #[test]
    fn empty_dataset_has_no_bounds() {
        let ds = Dataset::from_records(Vec::new());
        assert!(ds.is_empty());
        assert_eq!(ds.date_bounds, None);
        assert!(ds.options(Dimension::Category).is_empty());
    }
}
