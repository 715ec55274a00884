use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use tilted_irradiance::config::Config;
use tilted_irradiance::records::{count_out_of_order, ComputedRecord, QualityReport};
use tilted_irradiance::table::{TableReader, TableWriter};
use tilted_irradiance::tools::sun::Transform;

#[derive(Parser)]
#[command(name = "tilted_irradiance")]
#[command(author, version, about = "Irradiance on a tilted surface from hourly GHI and DHI", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Site and surface configuration (json5)
    #[arg(short, long, default_value = "config.json5")]
    config: PathBuf,

    /// Process records on a single thread
    #[arg(long)]
    sequential: bool,

    /// Input table with Hour, GHI and DHI columns
    #[arg(default_value = "630-datafile.csv")]
    input: PathBuf,

    /// Output table
    #[arg(default_value = "tilted_radiation.csv")]
    output: PathBuf,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);
    pb.set_message("records");
    Ok(pb)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    debug!("{:?}", config);
    let transform = Transform::new(config);

    let start = Instant::now();

    let mut reader = TableReader::from_path(&cli.input)?;
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Malformed record in {}", cli.input.display()))?;
    info!("Read {} records from {}", records.len(), cli.input.display());

    let out_of_order = count_out_of_order(&records);
    if out_of_order > 0 {
        warn!("{} records have a lower hour index than their predecessor", out_of_order);
    }

    let pb = progress_bar(records.len())?;
    let computed: Vec<ComputedRecord> = if cli.sequential {
        transform
            .apply_all(records)
            .inspect(|_| pb.inc(1))
            .collect()
    } else {
        transform
            .apply_par(records)
            .inspect(|_| pb.inc(1))
            .collect()
    };
    pb.finish_and_clear();

    for warning in computed.iter().flat_map(|record| record.warnings()) {
        debug!("{}", warning);
    }
    let mut report: QualityReport = computed.iter().collect();
    report.out_of_order = out_of_order;
    if report.is_clean() {
        info!("{}", report);
    } else {
        warn!("{}", report);
    }

    let mut writer = TableWriter::from_path(&cli.output, reader.passthrough_headers())?;
    for record in &computed {
        writer.write(record)?;
    }
    writer.finish()?;

    info!(
        "Results saved to {} in {:.2?}",
        cli.output.display(),
        start.elapsed()
    );
    Ok(())
}
