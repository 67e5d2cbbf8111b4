//! End-to-end pipeline runs against temporary directories.

use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::{ParquetReader, SerReader};
use sessionlab_core::domain::Frequency;
use sessionlab_core::io::dataframe_to_series;
use sessionlab_core::provider::{DataProvider, RequestWindow};
use sessionlab_core::SessionCalendar;
use sessionlab_runner::{
    export_bars_csv, load_manifest, run_pipeline, save_outputs, DataSource, PipelineConfig,
    PipelineError, SyntheticProvider,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 30).unwrap()
}

fn config(input: &Path, output: &Path, extra: &str) -> PipelineConfig {
    let toml = format!(
        r#"
        [data]
        input_dir = "{}"
        interval = "5m"
        market = "SPY"
        symbols = ["AAPL", "MSFT"]
        period = "30d"
        {extra}

        [output]
        dir = "{}"
        "#,
        input.display(),
        output.display()
    );
    PipelineConfig::from_toml(&toml).unwrap()
}

/// Write synthetic 5m bars for `symbol` into `dir` in the provider's layout.
fn seed_csv(dir: &Path, symbol: &str) {
    let window = RequestWindow::resolve(Some("30d"), None, None, today()).unwrap();
    let series = SyntheticProvider::new(SessionCalendar::us_equities())
        .fetch_bars(symbol, Frequency::Minutes(5), &window)
        .unwrap();
    let csv = export_bars_csv(&series).unwrap();
    std::fs::write(dir.join(format!("{symbol}_5m.csv")), csv).unwrap();
}

#[test]
fn synthetic_run_writes_panels_and_manifest() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let config = config(input.path(), output.path(), "synthetic = true");

    let report = run_pipeline(&config, today()).unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.panels.len(), 2);
    assert_eq!(report.market_source, DataSource::Synthetic);

    let manifest = save_outputs(&report, &config).unwrap();
    assert_eq!(manifest.config_id, config.config_id().unwrap());
    assert_eq!(manifest.window.end, NaiveDate::from_ymd_opt(2024, 3, 29).unwrap());

    for entry in &manifest.symbols {
        let path = output.path().join(&entry.file);
        assert!(path.is_file(), "{} missing", path.display());
        assert_eq!(entry.source, DataSource::Synthetic);
        assert!(entry.rows > 0);

        let csv = std::fs::read_to_string(&path).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("timestamp,open,high,low,close,volume,ema_8"));
        assert!(header.contains("rrs_d1"));
        assert!(header.contains("or30_high"));
        assert_eq!(csv.lines().count(), entry.rows + 1);
    }

    assert_eq!(load_manifest(output.path()).unwrap(), manifest);
}

#[test]
fn csv_inputs_are_used_and_missing_symbols_are_reported() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_csv(input.path(), "SPY");
    seed_csv(input.path(), "AAPL");
    let config = config(input.path(), output.path(), "");

    let report = run_pipeline(&config, today()).unwrap();
    assert_eq!(report.market_source, DataSource::Csv);
    assert_eq!(report.panels.len(), 1);
    assert_eq!(report.panels[0].symbol, "AAPL");
    assert_eq!(report.panels[0].source, DataSource::Csv);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].symbol, "MSFT");
    assert!(report.failures[0].error.contains("no data"));

    let manifest = save_outputs(&report, &config).unwrap();
    assert_eq!(manifest.failures, report.failures);
}

#[test]
fn missing_market_fails_the_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    seed_csv(input.path(), "AAPL");
    let config = config(input.path(), output.path(), "");

    let err = run_pipeline(&config, today()).unwrap_err();
    assert!(matches!(err, PipelineError::Load(_)));
}

#[test]
fn runs_are_deterministic() {
    let input = tempfile::tempdir().unwrap();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for out in [first.path(), second.path()] {
        let config = config(input.path(), out, "synthetic = true");
        let report = run_pipeline(&config, today()).unwrap();
        save_outputs(&report, &config).unwrap();
    }

    // manifest.json differs: the output dir is part of the config id.
    for file in ["AAPL_5m.csv", "MSFT_5m.csv"] {
        let a = std::fs::read(first.path().join(file)).unwrap();
        let b = std::fs::read(second.path().join(file)).unwrap();
        assert!(a == b, "{file} differs between runs");
    }
}

#[test]
fn parquet_output_reads_back() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let mut config = config(input.path(), output.path(), "synthetic = true");
    config.output.format = sessionlab_runner::OutputFormat::Parquet;

    let report = run_pipeline(&config, today()).unwrap();
    let manifest = save_outputs(&report, &config).unwrap();
    let entry = &manifest.symbols[0];
    assert!(entry.file.ends_with(".parquet"));

    let file = std::fs::File::open(output.path().join(&entry.file)).unwrap();
    let df = ParquetReader::new(file).finish().unwrap();
    assert_eq!(df.height(), entry.rows);
    assert_eq!(df.width(), 6 + entry.columns.len());

    let panel = &report
        .panels
        .iter()
        .find(|p| p.symbol == entry.symbol)
        .unwrap()
        .panel;
    let bars = dataframe_to_series(&df, &entry.symbol, Frequency::Minutes(5)).unwrap();
    assert_eq!(&bars, panel.series());
}
