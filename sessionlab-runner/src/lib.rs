//! SessionLab Runner: pipeline configuration, data loading, and export.
//!
//! This crate builds on `sessionlab-core` to provide:
//! - TOML pipeline configuration with content-addressed ids
//! - Data loading from a CSV directory with synthetic fallback
//! - Multi-instrument feature pipeline (one rayon worker per symbol)
//! - CSV / Parquet panel export with a JSON manifest

pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, FeatureConfig, OutputFormat, PipelineConfig};
pub use data_loader::{
    load_series, read_csv_file, CsvDirectoryProvider, DataSource, LoadError, LoadOptions,
    LoadedSeries, SyntheticProvider,
};
pub use export::{
    export_bars_csv, export_panel_csv, load_manifest, save_outputs, write_panel, Manifest,
    ManifestEntry,
};
pub use pipeline::{
    build_panel, run_pipeline, MarketContext, PipelineError, PipelineReport, SymbolFailure,
    SymbolPanel,
};
