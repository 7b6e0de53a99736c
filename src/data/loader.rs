use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{normalize_column_name, Dataset, Record};

/// Columns every input file must provide, after name normalization.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "order_id",
    "customer_id",
    "order_date",
    "ship_date",
    "region",
    "segment",
    "ship_mode",
    "category",
    "sales",
    "profit",
    "quantity",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a cleaned sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one sales line per row (recommended)
/// * `.json`    – `[{ "Order ID": "...", "Sales": 12.5, ... }, ...]`
/// * `.parquet` – one column per field; dates as `Date32` or text
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Shared row schema for the text formats
// ---------------------------------------------------------------------------

/// One row as it appears in CSV / JSON, before dates are coerced.
/// Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    order_id: String,
    customer_id: String,
    order_date: String,
    ship_date: String,
    region: String,
    segment: String,
    ship_mode: String,
    category: String,
    sales: f64,
    profit: f64,
    quantity: i64,
}

impl RawRow {
    fn into_record(self) -> Result<Record> {
        Ok(Record {
            order_date: parse_date(&self.order_date).context("order_date")?,
            ship_date: parse_date(&self.ship_date).context("ship_date")?,
            order_id: self.order_id,
            customer_id: self.customer_id,
            region: self.region,
            segment: self.segment,
            ship_mode: self.ship_mode,
            category: self.category,
            sales: self.sales,
            profit: self.profit,
            quantity: self.quantity,
        })
    }
}

fn check_required_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let present: Vec<&str> = columns.into_iter().collect();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        bail!("missing required column(s): {}", missing.join(", "));
    }
    Ok(())
}

/// Parse a calendar date from the encodings seen in exported sales data.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    bail!("'{s}' is not a recognised date")
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names in any case/spacing
/// (`Order Date`, `order_date`, ...). Columns beyond the required ones are
/// ignored.
fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = csv::StringRecord::from(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(normalize_column_name)
            .collect::<Vec<String>>(),
    );
    check_required_columns(headers.iter())?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let raw: RawRow = row
            .deserialize(Some(&headers))
            .with_context(|| format!("CSV row {row_no}"))?;
        records.push(raw.into_record().with_context(|| format!("CSV row {row_no}"))?);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, as `df.to_json(orient='records')`
/// writes it):
///
/// ```json
/// [
///   { "Order ID": "CA-2016-152156", "Order Date": "11/8/2016", "Sales": 261.96, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let normalized: serde_json::Map<String, JsonValue> = obj
            .iter()
            .map(|(key, val)| (normalize_column_name(key), val.clone()))
            .collect();
        if i == 0 {
            check_required_columns(normalized.keys().map(String::as_str))?;
        }

        let raw: RawRow = serde_json::from_value(JsonValue::Object(normalized))
            .with_context(|| format!("Row {i}"))?;
        records.push(raw.into_record().with_context(|| format!("Row {i}"))?);
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of sales lines.
///
/// Expected schema (column names normalized like the text formats):
/// - identifiers and dimensions: `Utf8` / `LargeUtf8`
/// - `order_date`, `ship_date`: `Date32`, or text in any [`parse_date`] format
/// - `sales`, `profit`: `Float64` / `Float32` / integer
/// - `quantity`: `Int64` / `Int32`
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = BatchColumns::new(&batch)?;

        for row in 0..batch.num_rows() {
            let record = columns
                .record(row)
                .with_context(|| format!("Row {}", records.len()))?;
            records.push(record);
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

/// The required columns of one record batch, resolved by normalized name.
struct BatchColumns<'a> {
    order_id: &'a Arc<dyn Array>,
    customer_id: &'a Arc<dyn Array>,
    order_date: &'a Arc<dyn Array>,
    ship_date: &'a Arc<dyn Array>,
    region: &'a Arc<dyn Array>,
    segment: &'a Arc<dyn Array>,
    ship_mode: &'a Arc<dyn Array>,
    category: &'a Arc<dyn Array>,
    sales: &'a Arc<dyn Array>,
    profit: &'a Arc<dyn Array>,
    quantity: &'a Arc<dyn Array>,
}

impl<'a> BatchColumns<'a> {
    fn new(batch: &'a RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let names: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| normalize_column_name(f.name()))
            .collect();
        check_required_columns(names.iter().map(String::as_str))?;

        let column = |name: &str| -> Result<&'a Arc<dyn Array>> {
            let idx = names
                .iter()
                .position(|n| n == name)
                .with_context(|| format!("Parquet file missing '{name}' column"))?;
            Ok(batch.column(idx))
        };

        Ok(BatchColumns {
            order_id: column("order_id")?,
            customer_id: column("customer_id")?,
            order_date: column("order_date")?,
            ship_date: column("ship_date")?,
            region: column("region")?,
            segment: column("segment")?,
            ship_mode: column("ship_mode")?,
            category: column("category")?,
            sales: column("sales")?,
            profit: column("profit")?,
            quantity: column("quantity")?,
        })
    }

    fn record(&self, row: usize) -> Result<Record> {
        Ok(Record {
            order_id: extract_string(self.order_id, row).context("order_id")?,
            customer_id: extract_string(self.customer_id, row).context("customer_id")?,
            order_date: extract_date(self.order_date, row).context("order_date")?,
            ship_date: extract_date(self.ship_date, row).context("ship_date")?,
            region: extract_string(self.region, row).context("region")?,
            segment: extract_string(self.segment, row).context("segment")?,
            ship_mode: extract_string(self.ship_mode, row).context("ship_mode")?,
            category: extract_string(self.category, row).context("category")?,
            sales: extract_f64(self.sales, row).context("sales")?,
            profit: extract_f64(self.profit, row).context("profit")?,
            quantity: extract_i64(self.quantity, row).context("quantity")?,
        })
    }
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("expected a string column, got {other:?}"),
    }
}

fn extract_date(col: &Arc<dyn Array>, row: usize) -> Result<NaiveDate> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Date32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Date32Array>()
                .context("expected Date32Array")?;
            let days = arr.value(row);
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| {
                    epoch.checked_add_signed(chrono::Duration::days(i64::from(days)))
                })
                .with_context(|| format!("day number {days} out of range"))
        }
        DataType::Utf8 | DataType::LargeUtf8 => parse_date(&extract_string(col, row)?),
        other => bail!("expected Date32 or a text column, got {other:?}"),
    }
}

fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(f64::from(arr.value(row)))
        }
        DataType::Int64 | DataType::Int32 => Ok(extract_i64(col, row)? as f64),
        other => bail!("expected a numeric column, got {other:?}"),
    }
}

fn extract_i64(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null value");
    }
    match col.data_type() {
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(arr.value(row))
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(i64::from(arr.value(row)))
        }
        other => bail!("expected an integer column, got {other:?}"),
    }
}
