//! Feature panel: a bar series plus named, timestamp-aligned feature columns.
//!
//! Built with consuming `with_*` methods; each returns a new panel with the
//! added columns and never touches another panel. Methods compose in any
//! order since each derives its columns from the bars alone (relative
//! strength also takes the market series).

pub mod session;

pub use session::{SessionFeatureBuilder, OPENING_RANGE_MINUTES};

use crate::domain::{BarSeries, FeatureColumn, Frequency};
use crate::error::{FeatureError, Result};
use crate::indicators::{Atr, Ema, Indicator, Macd, RevealedPivot};
use crate::relative_strength::relative_strength;
use crate::session::SessionCalendar;

/// Column names owned by the bars themselves.
pub const BAR_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone)]
pub struct FeaturePanel {
    series: BarSeries,
    calendar: SessionCalendar,
    columns: Vec<FeatureColumn>,
}

impl FeaturePanel {
    pub fn new(series: BarSeries, calendar: SessionCalendar) -> Self {
        Self {
            series,
            calendar,
            columns: Vec::new(),
        }
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Number of rows (bars).
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    fn session_features(&self) -> SessionFeatureBuilder {
        SessionFeatureBuilder::new(self.calendar)
    }

    /// Attach an externally computed column.
    ///
    /// Fails with [`FeatureError::InvalidField`] on a name clash and
    /// [`FeatureError::MisalignedSeries`] unless the column is on exactly
    /// this panel's timestamps.
    pub fn with_column(mut self, column: FeatureColumn) -> Result<Self> {
        let name = column.name();
        if BAR_COLUMNS.contains(&name) || self.column(name).is_some() {
            return Err(FeatureError::InvalidField {
                field: name.to_string(),
                allowed: "a name not already in the panel".to_string(),
            });
        }
        let ours = self.series.bars();
        let aligned = column.len() == ours.len()
            && column
                .timestamps()
                .iter()
                .zip(ours)
                .all(|(t, b)| *t == b.timestamp);
        if !aligned {
            return Err(FeatureError::MisalignedSeries(format!(
                "column '{name}' is not on the timestamps of '{}'",
                self.series.symbol()
            )));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Attach any causal indicator under its own name.
    pub fn with_indicator(self, indicator: &dyn Indicator) -> Result<Self> {
        let values = indicator.compute(self.series.bars());
        let column = FeatureColumn::for_series(&self.series, indicator.name(), values)?;
        self.with_column(column)
    }

    /// `ema_{length}` of close.
    pub fn with_ema(self, length: usize) -> Result<Self> {
        Self::check_length("ema", length)?;
        self.with_indicator(&Ema::new(length))
    }

    /// `atr_{length}`, Wilder smoothed.
    pub fn with_atr(self, length: usize) -> Result<Self> {
        Self::check_length("atr", length)?;
        self.with_indicator(&Atr::new(length))
    }

    /// `macd`, `macd_signal`, `macd_hist`.
    pub fn with_macd(self, fast: usize, slow: usize, signal: usize) -> Result<Self> {
        if fast == 0 || signal == 0 || fast >= slow {
            return Err(FeatureError::InvalidRange(format!(
                "macd lengths ({fast}, {slow}, {signal}) need 0 < fast < slow and signal > 0"
            )));
        }
        self.with_indicator(&Macd::line(fast, slow, signal))?
            .with_indicator(&Macd::signal(fast, slow, signal))?
            .with_indicator(&Macd::histogram(fast, slow, signal))
    }

    /// `pivot_high_{window}` and `pivot_low_{window}`: latest pivot revealed
    /// `window` bars after it formed.
    pub fn with_pivots(self, window: usize) -> Result<Self> {
        let high = RevealedPivot::high(window)?;
        let low = RevealedPivot::low(window)?;
        self.with_indicator(&high)?.with_indicator(&low)
    }

    /// `prev_day_{kind}`.
    pub fn with_previous_session(self, kind: &str) -> Result<Self> {
        let column = self.session_features().previous_session_value(&self.series, kind)?;
        self.with_column(column)
    }

    /// `curr_day_{kind}`.
    pub fn with_running_session(self, kind: &str) -> Result<Self> {
        let column = self.session_features().running_session_value(&self.series, kind)?;
        self.with_column(column)
    }

    /// `or{subwindow}_high` and `or{subwindow}_low`, using the series' own bar timeframe.
    pub fn with_opening_range(self, subwindow: u32) -> Result<Self> {
        let Frequency::Minutes(timeframe) = self.series.frequency() else {
            return Err(FeatureError::InvalidRange(
                "opening range needs an intraday series".into(),
            ));
        };
        let (high, low) = self
            .session_features()
            .opening_range(&self.series, subwindow, timeframe)?;
        self.with_column(high)?.with_column(low)
    }

    /// `rrs_{length}` against `market`.
    pub fn with_relative_strength(self, market: &BarSeries, length: usize, shift: usize) -> Result<Self> {
        let column = relative_strength(&self.series, market, length, shift)?;
        self.with_column(column)
    }

    /// Rows where every feature column is non-NaN.
    pub fn complete_rows(&self) -> FeaturePanel {
        let keep: Vec<bool> = (0..self.len())
            .map(|i| self.columns.iter().all(|c| !c.values()[i].is_nan()))
            .collect();

        let mut row = 0usize;
        let series = self.series.filtered(|_| {
            let k = keep[row];
            row += 1;
            k
        });

        let columns = self
            .columns
            .iter()
            .map(|c| {
                let (timestamps, values) = c
                    .timestamps()
                    .iter()
                    .zip(c.values())
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|((t, v), _)| (*t, *v))
                    .unzip();
                FeatureColumn::new(c.name(), c.frequency(), timestamps, values)
            })
            .collect::<Result<Vec<_>>>();

        FeaturePanel {
            series,
            calendar: self.calendar,
            // Filtering both sides with the same mask cannot misalign them.
            columns: columns.unwrap_or_default(),
        }
    }

    fn check_length(what: &str, length: usize) -> Result<()> {
        if length == 0 {
            return Err(FeatureError::InvalidRange(format!("{what} length must be >= 1")));
        }
        Ok(())
    }
}
