//! Data provider collaborator: trait, errors, and request windows.
//!
//! Providers hand the engine validated [`BarSeries`] in session-local time.
//! Anything that breaks the bar invariants is rejected at the boundary by
//! [`accept_bars`]. Retries and timeouts belong to the provider, not the engine.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, BarSeries, Frequency};
use crate::error::FeatureError;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("no data for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error(transparent)]
    Schema(#[from] FeatureError),
}

/// Trait for bar sources (CSV directories, synthetic data, remote APIs).
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Whether the provider can currently serve requests.
    fn is_available(&self) -> bool;

    /// Bars for `symbol` at `frequency` with session dates inside `window`.
    fn fetch_bars(
        &self,
        symbol: &str,
        frequency: Frequency,
        window: &RequestWindow,
    ) -> Result<BarSeries, ProviderError>;
}

/// Validate raw provider bars into a series.
///
/// Empty input is [`ProviderError::NoData`]; ordering or OHLC violations are
/// [`ProviderError::Schema`] naming the offending row.
pub fn accept_bars(symbol: &str, frequency: Frequency, bars: Vec<Bar>) -> Result<BarSeries, ProviderError> {
    if bars.is_empty() {
        return Err(ProviderError::NoData {
            symbol: symbol.to_string(),
        });
    }
    Ok(BarSeries::new(symbol, frequency, bars)?)
}

/// Inclusive range of session dates to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Lookback used when neither a period nor a start date is given.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 100;

/// Lookback for the `max` period.
pub const MAX_LOOKBACK_DAYS: i64 = 1825;

impl RequestWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FeatureError> {
        if end < start {
            return Err(FeatureError::InvalidRange(format!(
                "window end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolve a request from its optional parts.
    ///
    /// All arithmetic is on calendar dates:
    /// - `start` given: the window runs to `end`, or to yesterday
    /// - `period` given: `<n>d` is n days, `<n>y` is 365·n days, `ytd` starts
    ///   on January 1 of the end year, `max` is [`MAX_LOOKBACK_DAYS`]; the
    ///   window ends at `end`, or yesterday
    /// - neither: [`DEFAULT_LOOKBACK_DAYS`] ending yesterday
    pub fn resolve(
        period: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, FeatureError> {
        let end = end.unwrap_or(today - Duration::days(1));
        if let Some(start) = start {
            return Self::new(start, end);
        }
        let start = match period {
            None => end - Duration::days(DEFAULT_LOOKBACK_DAYS),
            Some(p) => Self::period_start(p, end)?,
        };
        Self::new(start, end)
    }

    fn period_start(period: &str, end: NaiveDate) -> Result<NaiveDate, FeatureError> {
        let raw = period.trim().to_ascii_lowercase();
        let invalid = || FeatureError::InvalidRange(format!("unrecognised period '{period}'"));

        match raw.as_str() {
            "ytd" => return NaiveDate::from_ymd_opt(end.year(), 1, 1).ok_or_else(invalid),
            "max" => return Ok(end - Duration::days(MAX_LOOKBACK_DAYS)),
            _ => {}
        }

        let unit = raw.chars().last().ok_or_else(invalid)?;
        let digits = &raw[..raw.len() - unit.len_utf8()];
        let n: i64 = digits.parse().map_err(|_| invalid())?;
        if n <= 0 {
            return Err(invalid());
        }
        let days = match unit {
            'd' => n,
            'y' => 365 * n,
            _ => return Err(invalid()),
        };
        Ok(end - Duration::days(days))
    }

    /// Whether a session date falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
