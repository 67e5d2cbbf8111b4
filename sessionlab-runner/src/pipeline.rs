//! Multi-instrument feature pipeline.
//!
//! Loads the reference market once, then builds one [`FeaturePanel`] per
//! symbol on a rayon worker. The market series and its daily resample are
//! shared read-only across workers. A symbol that fails to load or build is
//! recorded in the report and does not stop the others.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use sessionlab_core::domain::{BarSeries, Frequency};
use sessionlab_core::provider::RequestWindow;
use sessionlab_core::{
    relative_strength, CausalAligner, FeatureColumn, FeatureError, FeaturePanel, Resampler,
    SessionCalendar,
};

use crate::config::{ConfigError, FeatureConfig, PipelineConfig};
use crate::data_loader::{load_series, CsvDirectoryProvider, DataSource, LoadError, LoadOptions};

/// Name of the daily relative-strength column aligned onto the bars.
pub const DAILY_RRS_COLUMN: &str = "rrs_d1";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Load(#[from] LoadError),

    #[error("feature error: {0}")]
    Feature(#[from] FeatureError),
}

/// The reference market at the panel interval and at daily cadence.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub intraday: BarSeries,
    pub daily: BarSeries,
}

impl MarketContext {
    /// Build the context, resampling `series` to daily if it is intraday.
    pub fn new(series: BarSeries, calendar: &SessionCalendar) -> Result<Self, FeatureError> {
        let daily = match series.frequency() {
            Frequency::Daily => series.clone(),
            Frequency::Minutes(_) => Resampler::new(*calendar).resample(&series, Frequency::Daily)?,
        };
        Ok(Self {
            intraday: series,
            daily,
        })
    }
}

/// One finished panel.
#[derive(Debug, Clone)]
pub struct SymbolPanel {
    pub symbol: String,
    pub source: DataSource,
    pub panel: FeaturePanel,
}

/// A symbol that could not be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub config_id: String,
    pub window: RequestWindow,
    pub market_source: DataSource,
    pub panels: Vec<SymbolPanel>,
    pub failures: Vec<SymbolFailure>,
}

/// Build the configured feature panel for one series.
///
/// Column order: EMAs, ATR, `rrs_d1` (intraday series only), bar-level RRS,
/// previous-session levels, running-session levels, opening ranges, MACD,
/// pivots.
pub fn build_panel(
    series: BarSeries,
    market: &MarketContext,
    calendar: &SessionCalendar,
    features: &FeatureConfig,
) -> Result<FeaturePanel, FeatureError> {
    let intraday = series.frequency().is_intraday();
    let mut panel = FeaturePanel::new(series, *calendar);

    for &length in &features.emas {
        panel = panel.with_ema(length)?;
    }
    panel = panel.with_atr(features.atr_length)?;

    if intraday {
        let column = daily_relative_strength(panel.series(), market, calendar, features)?;
        panel = panel.with_column(column)?;
    }
    panel = panel.with_relative_strength(&market.intraday, features.rrs_intraday_length, 0)?;

    for kind in &features.previous_session {
        panel = panel.with_previous_session(kind)?;
    }
    for kind in &features.running_session {
        panel = panel.with_running_session(kind)?;
    }
    for &minutes in &features.opening_range {
        panel = panel.with_opening_range(minutes)?;
    }
    if let Some(m) = features.macd {
        panel = panel.with_macd(m.fast, m.slow, m.signal)?;
    }
    if let Some(window) = features.pivot_window {
        panel = panel.with_pivots(window)?;
    }

    Ok(if features.drop_incomplete {
        panel.complete_rows()
    } else {
        panel
    })
}

/// Daily RRS of `series` against the market, attached to every bar once the
/// session it was computed from has closed.
fn daily_relative_strength(
    series: &BarSeries,
    market: &MarketContext,
    calendar: &SessionCalendar,
    features: &FeatureConfig,
) -> Result<FeatureColumn, FeatureError> {
    let daily = Resampler::new(*calendar).resample(series, Frequency::Daily)?;
    let scores = relative_strength(
        &daily,
        &market.daily,
        features.rrs_daily_length,
        features.rrs_daily_shift,
    )?;
    Ok(CausalAligner::new(*calendar)
        .align(series, &scores, 0)?
        .renamed(DAILY_RRS_COLUMN))
}

/// Load and build every configured symbol.
///
/// Fails only if the config is invalid or the market cannot be loaded.
pub fn run_pipeline(config: &PipelineConfig, today: NaiveDate) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let calendar = config.calendar()?;
    let window = config.window(today)?;
    let config_id = config.config_id()?;
    let csv = CsvDirectoryProvider::new(&config.data.input_dir, calendar);
    let opts = LoadOptions {
        frequency: config.data.interval,
        window,
        synthetic: config.data.synthetic,
        round_decimals: config.data.round_decimals,
    };

    info!(
        config_id = %config_id,
        symbols = config.data.symbols.len(),
        market = %config.data.market,
        start = %window.start,
        end = %window.end,
        "starting pipeline"
    );

    let market_loaded = load_series(&config.data.market, &csv, &calendar, &opts)?;
    let market = MarketContext::new(market_loaded.series, &calendar)?;

    let results: Vec<Result<SymbolPanel, SymbolFailure>> = config
        .data
        .symbols
        .par_iter()
        .map(|symbol| {
            build_symbol(symbol, &csv, &market, &calendar, &config.features, &opts).map_err(|e| {
                warn!(symbol = %symbol, error = %e, "symbol failed");
                SymbolFailure {
                    symbol: symbol.clone(),
                    error: e.to_string(),
                }
            })
        })
        .collect();

    let mut panels = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(panel) => panels.push(panel),
            Err(failure) => failures.push(failure),
        }
    }

    info!(built = panels.len(), failed = failures.len(), "pipeline finished");
    Ok(PipelineReport {
        config_id,
        window,
        market_source: market_loaded.source,
        panels,
        failures,
    })
}

fn build_symbol(
    symbol: &str,
    csv: &CsvDirectoryProvider,
    market: &MarketContext,
    calendar: &SessionCalendar,
    features: &FeatureConfig,
    opts: &LoadOptions,
) -> Result<SymbolPanel, PipelineError> {
    let loaded = load_series(symbol, csv, calendar, opts)?;
    let panel = build_panel(loaded.series, market, calendar, features)?;
    info!(
        symbol,
        rows = panel.len(),
        columns = panel.columns().len(),
        "built panel"
    );
    Ok(SymbolPanel {
        symbol: symbol.to_string(),
        source: loaded.source,
        panel,
    })
}
