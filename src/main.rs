use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;

use sales_dash::{load_file, FilterRequest, Session};

#[derive(Parser, Debug)]
#[clap(name = "sales-dash", about, version)]
struct Args {
    /// Cleaned sales dataset (.csv, .json or .parquet).
    #[clap(parse(from_os_str))]
    dataset: PathBuf,

    /// JSON file with filter criteria; flags below override its fields.
    #[clap(long, parse(from_os_str))]
    criteria: Option<PathBuf>,

    /// First order date to include (YYYY-MM-DD).
    #[clap(long)]
    from: Option<NaiveDate>,

    /// Last order date to include (YYYY-MM-DD).
    #[clap(long)]
    to: Option<NaiveDate>,

    /// Region to include; repeat for several. Default: all.
    #[clap(long = "region", multiple_occurrences(true))]
    regions: Vec<String>,

    /// Segment to include; repeat for several. Default: all.
    #[clap(long = "segment", multiple_occurrences(true))]
    segments: Vec<String>,

    /// Ship mode to include; repeat for several. Default: all.
    #[clap(long = "ship-mode", multiple_occurrences(true))]
    ship_modes: Vec<String>,

    /// Category to include; repeat for several. Default: all.
    #[clap(long = "category", multiple_occurrences(true))]
    categories: Vec<String>,

    /// Print the summary as JSON instead of text.
    #[clap(long)]
    json: bool,

    /// Prefix for money amounts in the text report.
    #[clap(long, default_value = "Rp")]
    currency: String,

    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,
}

impl Args {
    /// Filter fields given on the command line; empty flags stay unset.
    fn filter_request(&self) -> FilterRequest {
        let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());
        FilterRequest {
            start: self.from,
            end: self.to,
            region: non_empty(&self.regions),
            segment: non_empty(&self.segments),
            ship_mode: non_empty(&self.ship_modes),
            category: non_empty(&self.categories),
        }
    }
}

fn read_criteria(path: &Path) -> Result<FilterRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading criteria file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing criteria file {}", path.display()))
}

fn run(args: &Args) -> Result<()> {
    let dataset = Arc::new(load_file(&args.dataset)?);

    let request = match &args.criteria {
        Some(path) => read_criteria(path)?.merge(args.filter_request()),
        None => args.filter_request(),
    };
    log::debug!("filter request: {request:?}");

    let mut session = Session::new(Arc::clone(&dataset));
    session.set_criteria(request.resolve(&dataset));
    let summary = session.summary();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("serializing summary")?
        );
    } else {
        print!("{}", summary.render_text(&args.currency));
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    if let Err(e) = run(&args) {
        log::error!("Failed: {e:#}");
        std::process::exit(1);
    }
}
