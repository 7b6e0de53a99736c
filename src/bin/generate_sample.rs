use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

/// Header spelling follows the usual superstore export.
#[derive(Serialize)]
struct Row {
    #[serde(rename = "Order ID")]
    order_id: String,
    #[serde(rename = "Order Date")]
    order_date: String,
    #[serde(rename = "Ship Date")]
    ship_date: String,
    #[serde(rename = "Ship Mode")]
    ship_mode: String,
    #[serde(rename = "Customer ID")]
    customer_id: String,
    #[serde(rename = "Segment")]
    segment: String,
    #[serde(rename = "Region")]
    region: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Sales")]
    sales: f64,
    #[serde(rename = "Quantity")]
    quantity: i64,
    #[serde(rename = "Profit")]
    profit: f64,
}

const REGIONS: [&str; 4] = ["Central", "East", "South", "West"];
const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];
const SHIP_MODES: [&str; 4] = ["First Class", "Same Day", "Second Class", "Standard Class"];
const CATEGORIES: [&str; 3] = ["Furniture", "Office Supplies", "Technology"];

fn generate_rows(rng: &mut SimpleRng, orders: usize) -> Result<Vec<(Row, NaiveDate, NaiveDate)>> {
    let first_day = NaiveDate::from_ymd_opt(2014, 1, 1).context("start date")?;
    let customers: Vec<String> = (0..200).map(|i| format!("CU-{:05}", 10000 + i * 7)).collect();

    let mut rows = Vec::new();
    for n in 0..orders {
        let order_date = first_day + Duration::days(rng.below(4 * 365) as i64);
        let ship_mode = rng.pick(&SHIP_MODES);
        let ship_days = match ship_mode {
            "Same Day" => 0,
            "First Class" => 2,
            "Second Class" => 3,
            _ => 5,
        };
        let ship_date = order_date + Duration::days(ship_days);
        let order_id = format!("CA-{}-{:06}", order_date.year(), 100000 + n);
        let customer_id = customers[rng.below(customers.len())].clone();
        let segment = rng.pick(&SEGMENTS);
        let region = rng.pick(&REGIONS);

        // An order spans one to four lines.
        for _ in 0..=rng.below(4) {
            let quantity = 1 + rng.below(9) as i64;
            let unit_price = 2.0 + rng.next_f64() * 150.0;
            let sales = (unit_price * quantity as f64 * 100.0).round() / 100.0;
            let margin = rng.next_f64() * 0.6 - 0.2;
            let profit = (sales * margin * 10000.0).round() / 10000.0;

            rows.push((
                Row {
                    order_id: order_id.clone(),
                    order_date: order_date.format("%m/%d/%Y").to_string(),
                    ship_date: ship_date.format("%m/%d/%Y").to_string(),
                    ship_mode: ship_mode.to_string(),
                    customer_id: customer_id.clone(),
                    segment: segment.to_string(),
                    region: region.to_string(),
                    category: rng.pick(&CATEGORIES).to_string(),
                    sales,
                    quantity,
                    profit,
                },
                order_date,
                ship_date,
            ));
        }
    }
    Ok(rows)
}

fn days_since_epoch(date: NaiveDate) -> Result<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
    i32::try_from((date - epoch).num_days()).context("date out of Date32 range")
}

fn to_batch(rows: &[(Row, NaiveDate, NaiveDate)]) -> Result<RecordBatch> {
    let text = |f: fn(&Row) -> &str| {
        StringArray::from(rows.iter().map(|(r, _, _)| f(r)).collect::<Vec<&str>>())
    };
    let order_dates = rows
        .iter()
        .map(|(_, d, _)| days_since_epoch(*d))
        .collect::<Result<Vec<i32>>>()?;
    let ship_dates = rows
        .iter()
        .map(|(_, _, d)| days_since_epoch(*d))
        .collect::<Result<Vec<i32>>>()?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("Order ID", DataType::Utf8, false),
        Field::new("Order Date", DataType::Date32, false),
        Field::new("Ship Date", DataType::Date32, false),
        Field::new("Ship Mode", DataType::Utf8, false),
        Field::new("Customer ID", DataType::Utf8, false),
        Field::new("Segment", DataType::Utf8, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Sales", DataType::Float64, false),
        Field::new("Quantity", DataType::Int64, false),
        Field::new("Profit", DataType::Float64, false),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(text(|r| r.order_id.as_str())),
            Arc::new(Date32Array::from(order_dates)),
            Arc::new(Date32Array::from(ship_dates)),
            Arc::new(text(|r| r.ship_mode.as_str())),
            Arc::new(text(|r| r.customer_id.as_str())),
            Arc::new(text(|r| r.segment.as_str())),
            Arc::new(text(|r| r.region.as_str())),
            Arc::new(text(|r| r.category.as_str())),
            Arc::new(Float64Array::from(rows.iter().map(|(r, _, _)| r.sales).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(rows.iter().map(|(r, _, _)| r.quantity).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|(r, _, _)| r.profit).collect::<Vec<_>>())),
        ],
    )
    .context("building record batch")
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_default();
    let mut rng = SimpleRng::new(42);
    let rows = generate_rows(&mut rng, 2000)?;

    // Write CSV
    let csv_path = out_dir.join("sample_superstore.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for (row, _, _) in &rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;

    // Write Parquet
    let batch = to_batch(&rows)?;
    let parquet_path = out_dir.join("sample_superstore.parquet");
    let file = std::fs::File::create(&parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    arrow::util::pretty::print_batches(&[batch.slice(0, batch.num_rows().min(5))])
        .context("printing preview")?;
    log::info!(
        "wrote {} sales lines to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
