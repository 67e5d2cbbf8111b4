//! SessionLab CLI: build feature panels and resample bar files.
//!
//! Commands:
//! - `build`: run a pipeline from a TOML config and write panels + manifest
//! - `resample`: aggregate one CSV bar file to a coarser frequency
//! - `manifest`: summarise the manifest of a previous build

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sessionlab_core::domain::Frequency;
use sessionlab_core::{Resampler, SessionCalendar};
use sessionlab_runner::{
    export_bars_csv, load_manifest, read_csv_file, run_pipeline, save_outputs, Manifest,
    OutputFormat, PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "sessionlab",
    about = "SessionLab CLI: session-aware bar aggregation and causal features"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build feature panels for every symbol in a pipeline config.
    Build {
        /// Path to a TOML pipeline config.
        #[arg(long)]
        config: PathBuf,

        /// Generate synthetic bars for symbols without input files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Override the output format (csv or parquet).
        #[arg(long)]
        format: Option<String>,

        /// Reference date for period windows (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Resample a CSV bar file to a coarser frequency.
    Resample {
        /// Input CSV (timestamp,open,high,low,close,volume).
        #[arg(long)]
        input: PathBuf,

        /// Symbol name recorded on the series.
        #[arg(long)]
        symbol: String,

        /// Frequency of the input bars (e.g. 5m).
        #[arg(long)]
        from: Frequency,

        /// Target frequency (e.g. 30m, 1h, 1d).
        #[arg(long)]
        to: Frequency,

        /// Output CSV. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Session time zone.
        #[arg(long, default_value = "America/New_York")]
        timezone: String,

        /// Session open (HH:MM).
        #[arg(long, default_value = "09:30")]
        open: String,

        /// Session close (HH:MM).
        #[arg(long, default_value = "16:00")]
        close: String,
    },
    /// Print a summary of a build's manifest.json.
    Manifest {
        /// Output directory of a previous build.
        #[arg(long)]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sessionlab=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            synthetic,
            format,
            today,
        } => run_build(&config, synthetic, format.as_deref(), today),
        Commands::Resample {
            input,
            symbol,
            from,
            to,
            output,
            timezone,
            open,
            close,
        } => {
            let calendar = SessionCalendar::parse(&timezone, &open, &close)?;
            run_resample(&input, &symbol, from, to, output.as_deref(), &calendar)
        }
        Commands::Manifest { dir } => {
            let manifest = load_manifest(&dir)?;
            print_summary(&manifest, &dir);
            Ok(())
        }
    }
}

fn run_build(
    config_path: &Path,
    synthetic: bool,
    format: Option<&str>,
    today: Option<NaiveDate>,
) -> Result<()> {
    let mut config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    if synthetic {
        config.data.synthetic = true;
    }
    if let Some(format) = format {
        config.output.format = match format {
            "csv" => OutputFormat::Csv,
            "parquet" => OutputFormat::Parquet,
            other => bail!("unknown output format '{other}' (expected csv or parquet)"),
        };
    }
    let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());

    let report = run_pipeline(&config, today)?;
    let manifest = save_outputs(&report, &config)?;
    print_summary(&manifest, &config.output.dir);

    if manifest.symbols.is_empty() {
        bail!("no panel could be built ({} failures)", manifest.failures.len());
    }
    Ok(())
}

fn run_resample(
    input: &Path,
    symbol: &str,
    from: Frequency,
    to: Frequency,
    output: Option<&Path>,
    calendar: &SessionCalendar,
) -> Result<()> {
    let series = read_csv_file(input, symbol, from, calendar)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let resampled = Resampler::new(*calendar).resample(&series, to)?;
    tracing::info!(
        symbol,
        from = %from,
        to = %to,
        bars_in = series.len(),
        bars_out = resampled.len(),
        "resampled"
    );

    let csv = export_bars_csv(&resampled)?;
    match output {
        Some(path) => std::fs::write(path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{csv}"),
    }
    Ok(())
}

fn print_summary(manifest: &Manifest, dir: &Path) {
    println!();
    println!("=== Feature Build ===");
    println!("Config:     {}", &manifest.config_id[..manifest.config_id.len().min(12)]);
    println!("Interval:   {}", manifest.interval);
    println!(
        "Window:     {} to {}",
        manifest.window.start, manifest.window.end
    );
    println!("Market:     {} ({:?})", manifest.market, manifest.market_source);
    println!("Output:     {}", dir.display());
    println!();
    println!("{:<10} {:>8} {:>8}  File", "Symbol", "Rows", "Columns");
    for entry in &manifest.symbols {
        println!(
            "{:<10} {:>8} {:>8}  {}",
            entry.symbol,
            entry.rows,
            entry.columns.len(),
            entry.file
        );
    }
    if !manifest.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &manifest.failures {
            println!("  {}: {}", failure.symbol, failure.error);
        }
    }
}
