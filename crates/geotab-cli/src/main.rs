//! geotab CLI
//!
//! Geocodes a spreadsheet or CSV file of US addresses and saves the
//! annotated table as CSV.

use clap::Parser;
use geotab_core::processor::PROGRESS_INTERVAL;
use geotab_core::{load_table, process, write_csv, GeocoderConfig, HttpGeocoder, ProcessorOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geotab")]
#[command(about = "Geocoding against the Google API", long_about = None)]
#[command(version)]
struct Cli {
    /// The Google API key to use
    #[arg(short, long)]
    key: Option<String>,

    /// The spreadsheet or CSV file you want to process
    #[arg(short, long)]
    input: PathBuf,

    /// The CSV file you want the results saved to
    #[arg(short, long)]
    output: PathBuf,

    /// Geocoding endpoint
    #[arg(long, default_value = geotab_core::geocoder::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Log a progress line every N rows
    #[arg(long, default_value_t = PROGRESS_INTERVAL as u64,
          value_parser = clap::value_parser!(u64).range(1..))]
    progress_every: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> geotab_core::Result<()> {
    let mut table = load_table(&cli.input)?;
    info!(
        "Loaded {} rows from {}",
        table.row_count(),
        cli.input.display()
    );

    let config = GeocoderConfig::default()
        .with_endpoint(cli.endpoint)
        .with_api_key(cli.key)
        .with_timeout(Duration::from_secs(cli.timeout));
    let geocoder = HttpGeocoder::new(config)?;

    let options = ProcessorOptions {
        progress_interval: cli.progress_every as usize,
    };
    process(&mut table, &geocoder, &options)?;

    info!("Saving...");
    write_csv(&table, &cli.output)?;
    info!("Wrote {} rows to {}", table.row_count(), cli.output.display());

    Ok(())
}
