//! Panel export: CSV, Parquet, and a JSON manifest.
//!
//! Every symbol gets one file named `{SYMBOL}_{interval}.{csv|parquet}`.
//! The run is described by `manifest.json` (config id, window, per-symbol
//! row counts and columns, failures). Manifests carry a `schema_version`;
//! unknown versions are rejected on load.
//!
//! CSV files use the same layout the CSV directory provider reads, so an
//! exported bar file can be fed back in as input.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use polars::prelude::ParquetWriter;
use serde::{Deserialize, Serialize};
use tracing::info;

use sessionlab_core::domain::{BarSeries, FeatureColumn, Frequency};
use sessionlab_core::features::BAR_COLUMNS;
use sessionlab_core::io::panel_to_dataframe;
use sessionlab_core::provider::RequestWindow;
use sessionlab_core::FeaturePanel;

use crate::config::{OutputFormat, PipelineConfig};
use crate::data_loader::DataSource;
use crate::pipeline::{PipelineReport, SymbolFailure};

/// Current schema version for `manifest.json`.
pub const SCHEMA_VERSION: u32 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── CSV export ─────────────────────────────────────────────────────

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn write_csv(series: &BarSeries, columns: &[FeatureColumn]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let header: Vec<&str> = BAR_COLUMNS
        .iter()
        .copied()
        .chain(columns.iter().map(|c| c.name()))
        .collect();
    wtr.write_record(&header)?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut record = vec![
            bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format_value(bar.open),
            format_value(bar.high),
            format_value(bar.low),
            format_value(bar.close),
            bar.volume.to_string(),
        ];
        record.extend(columns.iter().map(|c| format_value(c.values()[i])));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Bars only: `timestamp,open,high,low,close,volume`.
pub fn export_bars_csv(series: &BarSeries) -> Result<String> {
    write_csv(series, &[])
}

/// Bars followed by every feature column. Unknown feature values are empty cells.
pub fn export_panel_csv(panel: &FeaturePanel) -> Result<String> {
    write_csv(panel.series(), panel.columns())
}

// ─── Parquet export ─────────────────────────────────────────────────

fn write_parquet(panel: &FeaturePanel, path: &Path) -> Result<()> {
    let mut df = panel_to_dataframe(panel)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write parquet {}", path.display()))?;
    Ok(())
}

/// File name for a symbol's output.
pub fn output_file_name(symbol: &str, interval: Frequency, format: OutputFormat) -> String {
    format!("{symbol}_{interval}.{}", format.extension())
}

/// Write one panel into `dir`, returning the file path.
pub fn write_panel(panel: &FeaturePanel, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    let series = panel.series();
    let path = dir.join(output_file_name(series.symbol(), series.frequency(), format));
    match format {
        OutputFormat::Csv => {
            let csv = export_panel_csv(panel)?;
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        OutputFormat::Parquet => write_parquet(panel, &path)?,
    }
    Ok(path)
}

// ─── Manifest ───────────────────────────────────────────────────────

/// Per-symbol entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub symbol: String,
    pub source: DataSource,
    pub file: String,
    pub rows: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub columns: Vec<String>,
}

/// Description of a pipeline run's outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_id: String,
    pub interval: Frequency,
    pub window: RequestWindow,
    pub market: String,
    pub market_source: DataSource,
    pub format: OutputFormat,
    pub symbols: Vec<ManifestEntry>,
    pub failures: Vec<SymbolFailure>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest(json: &str) -> Result<Manifest> {
    let manifest: Manifest =
        serde_json::from_str(json).context("failed to deserialize manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

/// Load `manifest.json` from an output directory.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest(&json)
}

// ─── Output bundle ──────────────────────────────────────────────────

/// Write every panel of `report` plus `manifest.json` into `config.output.dir`.
pub fn save_outputs(report: &PipelineReport, config: &PipelineConfig) -> Result<Manifest> {
    let dir = &config.output.dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let mut symbols = Vec::with_capacity(report.panels.len());
    for item in &report.panels {
        let path = write_panel(&item.panel, dir, config.output.format)?;
        let series = item.panel.series();
        symbols.push(ManifestEntry {
            symbol: item.symbol.clone(),
            source: item.source,
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            rows: item.panel.len(),
            first: series.first().map(|b| b.timestamp),
            last: series.last().map(|b| b.timestamp),
            columns: item
                .panel
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
        info!(symbol = %item.symbol, path = %path.display(), "wrote panel");
    }

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        config_id: report.config_id.clone(),
        interval: config.data.interval,
        window: report.window,
        market: config.data.market.clone(),
        market_source: report.market_source,
        format: config.output.format,
        symbols,
        failures: report.failures.clone(),
    };
    let json =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest to JSON")?;
    std::fs::write(dir.join("manifest.json"), json)
        .with_context(|| format!("failed to write manifest in {}", dir.display()))?;
    Ok(manifest)
}
