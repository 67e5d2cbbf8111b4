//! Bar loading and data resolution for the runner.
//!
//! Given a symbol, loads bars from the CSV directory and returns a validated,
//! session-filtered series. Implements the fallback policy:
//! 1. If `{dir}/{SYMBOL}_{interval}.csv` exists → use it
//! 2. If not and synthetic data is enabled → generate synthetic bars (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode for demos and tests.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use sessionlab_core::domain::{Bar, BarSeries, Frequency};
use sessionlab_core::provider::{accept_bars, DataProvider, ProviderError, RequestWindow};
use sessionlab_core::{FeatureError, SessionCalendar};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data for '{symbol}' (use synthetic = true for synthetic data)")]
    NoData { symbol: String },

    #[error("loading '{symbol}' from {provider} failed: {source}")]
    Provider {
        symbol: String,
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Csv,
    Synthetic,
}

impl DataSource {
    /// Name of the provider that produced the series.
    pub fn provider_name(self) -> &'static str {
        match self {
            DataSource::Csv => "csv",
            DataSource::Synthetic => "synthetic",
        }
    }
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub frequency: Frequency,
    pub window: RequestWindow,
    /// Generate synthetic bars when no file is available.
    pub synthetic: bool,
    /// Round OHLC to this many decimals.
    pub round_decimals: Option<u32>,
}

/// A loaded series with its provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: BarSeries,
    pub source: DataSource,
}

// ─── CSV directory provider ─────────────────────────────────────────

/// Reads `{dir}/{SYMBOL}_{interval}.csv` files.
///
/// Expected header: `timestamp,open,high,low,close,volume`. Capitalised
/// names (`Datetime`, `Open`, ...) are accepted too. Timestamps are session
/// wall-clock times; values carrying a UTC offset are converted into the
/// calendar's zone.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
    calendar: SessionCalendar,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Datetime", alias = "datetime", alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>, calendar: SessionCalendar) -> Self {
        Self {
            dir: dir.into(),
            calendar,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `symbol` at `frequency`.
    pub fn path_for(&self, symbol: &str, frequency: Frequency) -> PathBuf {
        self.dir.join(format!("{symbol}_{frequency}.csv"))
    }

    fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%:z"] {
            if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
                return Some(self.calendar.localize(dt.with_timezone(&Utc)));
            }
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(ts);
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Read every row of `path` into bars.
    fn read_bars(&self, path: &Path) -> Result<Vec<Bar>, ProviderError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| ProviderError::ProviderUnavailable(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
            let record = record.map_err(|e| FeatureError::SchemaViolation {
                row,
                reason: e.to_string(),
            })?;
            let timestamp =
                self.parse_timestamp(&record.timestamp)
                    .ok_or_else(|| FeatureError::SchemaViolation {
                        row,
                        reason: format!("unparseable timestamp '{}'", record.timestamp),
                    })?;
            if !(record.volume.is_finite() && record.volume >= 0.0) {
                return Err(FeatureError::SchemaViolation {
                    row,
                    reason: format!("invalid volume {}", record.volume),
                }
                .into());
            }
            bars.push(Bar {
                timestamp,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume.round() as u64,
            });
        }
        Ok(bars)
    }
}

impl DataProvider for CsvDirectoryProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        frequency: Frequency,
        window: &RequestWindow,
    ) -> Result<BarSeries, ProviderError> {
        let path = self.path_for(symbol, frequency);
        if !path.is_file() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let bars: Vec<Bar> = self
            .read_bars(&path)?
            .into_iter()
            .filter(|b| window.contains(self.calendar.session_date(b.timestamp)))
            .collect();
        debug!(symbol, path = %path.display(), rows = bars.len(), "read csv bars");
        accept_bars(symbol, frequency, bars)
    }
}

/// Read a single bar file outside any directory layout.
pub fn read_csv_file(
    path: &Path,
    symbol: &str,
    frequency: Frequency,
    calendar: &SessionCalendar,
) -> Result<BarSeries, ProviderError> {
    let provider = CsvDirectoryProvider::new(path.parent().unwrap_or(Path::new(".")), *calendar);
    accept_bars(symbol, frequency, provider.read_bars(path)?)
}

// ─── Synthetic provider ─────────────────────────────────────────────

/// Deterministic random-walk bars for every weekday session in the window.
///
/// The walk is seeded from the symbol name, so the same symbol always yields
/// the same bars.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticProvider {
    calendar: SessionCalendar,
}

impl SyntheticProvider {
    pub fn new(calendar: SessionCalendar) -> Self {
        Self { calendar }
    }

    fn session_labels(&self, date: NaiveDate, frequency: Frequency) -> Vec<NaiveDateTime> {
        match frequency.duration() {
            None => date.and_hms_opt(0, 0, 0).into_iter().collect(),
            Some(step) => {
                let close = self.calendar.session_close_at(date);
                let mut labels = Vec::new();
                let mut ts = self.calendar.session_open_at(date);
                while ts < close {
                    labels.push(ts);
                    ts += step;
                }
                labels
            }
        }
    }

    /// Generate the bars without validation.
    pub fn generate(&self, symbol: &str, frequency: Frequency, window: &RequestWindow) -> Vec<Bar> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        // Per-bar moves shrink with the bar length so daily and 5m walks look alike.
        let bars_per_session = match frequency.minutes() {
            Some(m) => (self.calendar.session_length().num_minutes() as f64 / f64::from(m)).max(1.0),
            None => 1.0,
        };
        let step = 0.02 / bars_per_session.sqrt();

        let mut bars = Vec::new();
        let mut price = 100.0_f64;
        let mut date = window.start;
        while date <= window.end {
            if !self.calendar.is_trading_day(date) {
                date += Duration::days(1);
                continue;
            }
            for timestamp in self.session_labels(date, frequency) {
                let change: f64 = rng.gen_range(-step..step);
                let open = price;
                let close = price * (1.0 + change);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..step / 2.0));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..step / 2.0));
                let volume = rng.gen_range(1_000..50_000u64);
                bars.push(Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                });
                price = close;
            }
            date += Duration::days(1);
        }
        bars
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        frequency: Frequency,
        window: &RequestWindow,
    ) -> Result<BarSeries, ProviderError> {
        accept_bars(symbol, frequency, self.generate(symbol, frequency, window))
    }
}

// ─── Loading ────────────────────────────────────────────────────────

/// Load one symbol, falling back to synthetic data if enabled.
///
/// Intraday series are restricted to in-session bars and optionally rounded.
/// A file that exists but is malformed is an error, not a reason to fall back.
pub fn load_series(
    symbol: &str,
    csv: &CsvDirectoryProvider,
    calendar: &SessionCalendar,
    opts: &LoadOptions,
) -> Result<LoadedSeries, LoadError> {
    let provider_error = |provider: &str, source| LoadError::Provider {
        symbol: symbol.to_string(),
        provider: provider.to_string(),
        source,
    };

    let (series, source) = match csv.fetch_bars(symbol, opts.frequency, &opts.window) {
        Ok(series) => (series, DataSource::Csv),
        Err(ProviderError::NoData { .. }) if opts.synthetic => {
            warn!(symbol, "no csv data; generating synthetic bars");
            let synthetic = SyntheticProvider::new(*calendar);
            let series = synthetic
                .fetch_bars(symbol, opts.frequency, &opts.window)
                .map_err(|e| provider_error(synthetic.name(), e))?;
            (series, DataSource::Synthetic)
        }
        Err(ProviderError::NoData { .. }) => {
            return Err(LoadError::NoData {
                symbol: symbol.to_string(),
            })
        }
        Err(e) => return Err(provider_error(csv.name(), e)),
    };

    let mut series = calendar.filter_session(&series);
    if let Some(decimals) = opts.round_decimals {
        series = series
            .rounded(decimals)
            .map_err(|e| provider_error(source.provider_name(), ProviderError::Schema(e)))?;
    }
    if series.is_empty() {
        return Err(LoadError::NoData {
            symbol: symbol.to_string(),
        });
    }
    info!(
        symbol,
        source = ?source,
        bars = series.len(),
        frequency = %series.frequency(),
        "loaded series"
    );
    Ok(LoadedSeries { series, source })
}
