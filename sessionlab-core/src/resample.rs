//! Resampler: OHLCV aggregation from a finer to a coarser frequency.
//!
//! Bins come from [`SessionCalendar::bin_start`], so intraday bins are aligned
//! to the session open. Only in-session bars are aggregated, at every target,
//! so no bin ever holds a bar from after its own close.
//!
//! Completeness:
//! - every interior bin holding at least one source bar is emitted
//! - the first bin is dropped when the series starts after the bin's open
//! - the last bin is dropped when the series ends before the bin closes

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{Bar, BarSeries, Frequency};
use crate::error::{FeatureError, Result};
use crate::session::SessionCalendar;

#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    calendar: SessionCalendar,
}

/// Bars accumulated for one bin.
struct Bin {
    start: NaiveDateTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl Bin {
    fn open_with(start: NaiveDateTime, bar: &Bar) -> Self {
        Self {
            start,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }

    fn absorb(&mut self, bar: &Bar) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume = self.volume.saturating_add(bar.volume);
    }

    fn into_bar(self) -> Bar {
        Bar {
            timestamp: self.start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

impl Resampler {
    pub fn new(calendar: SessionCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Aggregate `series` into complete bins at `target`.
    ///
    /// Open = first open, High = max high, Low = min low, Close = last close,
    /// Volume = sum. Each output bar is labelled with its bin start.
    pub fn resample(&self, series: &BarSeries, target: Frequency) -> Result<BarSeries> {
        let source = series.frequency();
        if series.is_empty() {
            return Err(FeatureError::EmptyInput(format!(
                "cannot resample empty series '{}'",
                series.symbol()
            )));
        }
        if !target.is_coarser_than(source) {
            return Err(FeatureError::InvalidFrequency {
                from: source,
                to: target,
            });
        }

        let mut bins: Vec<Bin> = Vec::new();
        let mut first_ts = None;
        let mut last_ts = None;

        for bar in series.bars() {
            if !self.calendar.in_session(bar.timestamp) {
                continue;
            }
            first_ts.get_or_insert(bar.timestamp);
            last_ts = Some(bar.timestamp);

            let start = self.calendar.bin_start(bar.timestamp, target);
            match bins.last_mut() {
                // A label at or before the current one continues the current bin,
                // which keeps output labels strictly increasing.
                Some(bin) if start <= bin.start => bin.absorb(bar),
                _ => bins.push(Bin::open_with(start, bar)),
            }
        }

        let (Some(first_ts), Some(last_ts)) = (first_ts, last_ts) else {
            return Err(FeatureError::EmptyInput(format!(
                "series '{}' has no in-session bars to aggregate to {target}",
                series.symbol()
            )));
        };

        if let Some(first) = bins.first() {
            let effective_open = match target {
                Frequency::Daily => self.calendar.session_open_at(first.start.date()),
                Frequency::Minutes(_) => first.start,
            };
            if first_ts > effective_open {
                debug!(
                    symbol = series.symbol(),
                    bin = %first.start,
                    first_bar = %first_ts,
                    "dropping partial leading bin"
                );
                bins.remove(0);
            }
        }

        if let Some(last) = bins.last() {
            let bin_end = self.calendar.bin_end(last.start, target);
            let covered_until = source
                .duration()
                .map_or(last_ts, |step| last_ts + step);
            if covered_until < bin_end {
                debug!(
                    symbol = series.symbol(),
                    bin = %last.start,
                    covered_until = %covered_until,
                    bin_end = %bin_end,
                    "dropping partial trailing bin"
                );
                bins.pop();
            }
        }

        let bars = bins.into_iter().map(Bin::into_bar).collect();
        Ok(BarSeries::from_validated(series.symbol(), target, bars))
    }
}
