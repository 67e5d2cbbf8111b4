//! Session-relative reference levels.
//!
//! - previous session open/high/low/close
//! - running current-session open/high/low
//! - opening-range high/low
//!
//! Each value is NaN until it is knowable at the bar it is attached to, and
//! intraday bars outside the session window always read NaN.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::align::CausalAligner;
use crate::domain::{BarSeries, FeatureColumn, Frequency, PriceField};
use crate::error::{FeatureError, Result};
use crate::resample::Resampler;
use crate::session::SessionCalendar;

/// Subwindows accepted by [`SessionFeatureBuilder::opening_range`].
pub const OPENING_RANGE_MINUTES: [u32; 5] = [5, 15, 30, 60, 90];

const PREVIOUS_FIELDS: [PriceField; 4] = [
    PriceField::Open,
    PriceField::High,
    PriceField::Low,
    PriceField::Close,
];

const RUNNING_FIELDS: [PriceField; 3] = [PriceField::Open, PriceField::High, PriceField::Low];

#[derive(Debug, Clone, Copy)]
pub struct SessionFeatureBuilder {
    calendar: SessionCalendar,
    resampler: Resampler,
    aligner: CausalAligner,
}

impl SessionFeatureBuilder {
    pub fn new(calendar: SessionCalendar) -> Self {
        Self {
            calendar,
            resampler: Resampler::new(calendar),
            aligner: CausalAligner::new(calendar),
        }
    }

    /// Daily view of `series`: the series itself if already daily.
    fn daily(&self, series: &BarSeries) -> Result<BarSeries> {
        match series.frequency() {
            Frequency::Daily => Ok(series.clone()),
            Frequency::Minutes(_) => self.resampler.resample(series, Frequency::Daily),
        }
    }

    fn mask_out_of_session(&self, series: &BarSeries, mut values: Vec<f64>) -> Vec<f64> {
        let frequency = series.frequency();
        for (v, bar) in values.iter_mut().zip(series.bars()) {
            if !self.calendar.is_session_bar(bar.timestamp, frequency) {
                *v = f64::NAN;
            }
        }
        values
    }

    /// `prev_day_{kind}`: the last completed session's value, `kind` in open/high/low/close.
    pub fn previous_session_value(&self, series: &BarSeries, kind: &str) -> Result<FeatureColumn> {
        let field = PriceField::parse_among(kind, &PREVIOUS_FIELDS)?;
        let name = format!("prev_day_{}", field.as_str());
        if series.is_empty() {
            return FeatureColumn::for_series(series, name, Vec::new());
        }

        let daily = self.daily(series)?;
        let daily_values = daily.bars().iter().map(|b| field.value(b)).collect();
        let daily_column = FeatureColumn::for_series(&daily, name.as_str(), daily_values)?;
        let aligned = self.aligner.align(series, &daily_column, 1)?;

        let values = self.mask_out_of_session(series, aligned.values().to_vec());
        FeatureColumn::for_series(series, name, values)
    }

    /// `curr_day_{kind}`: the current session's open, or its high/low so far.
    ///
    /// High and low reset at every session boundary. On a daily series each
    /// bar carries its own value.
    pub fn running_session_value(&self, series: &BarSeries, kind: &str) -> Result<FeatureColumn> {
        let field = PriceField::parse_among(kind, &RUNNING_FIELDS)?;
        let name = format!("curr_day_{}", field.as_str());

        if series.frequency() == Frequency::Daily {
            let values = series.bars().iter().map(|b| field.value(b)).collect();
            return FeatureColumn::for_series(series, name, values);
        }

        let mut values = Vec::with_capacity(series.len());
        let mut current: Option<(NaiveDate, f64)> = None;
        for bar in series.bars() {
            if !self.calendar.in_session(bar.timestamp) {
                values.push(f64::NAN);
                continue;
            }
            let date = self.calendar.session_date(bar.timestamp);
            let level = match (current, field) {
                (Some((d, level)), PriceField::Open) if d == date => level,
                (Some((d, level)), PriceField::High) if d == date => level.max(bar.high),
                (Some((d, level)), PriceField::Low) if d == date => level.min(bar.low),
                _ => field.value(bar),
            };
            current = Some((date, level));
            values.push(level);
        }
        FeatureColumn::for_series(series, name, values)
    }

    /// `or{subwindow}_high` and `or{subwindow}_low`.
    ///
    /// The range covers `[open, open + subwindow)` of each session. Bars
    /// labelled before `open + subwindow` read NaN, as do sessions whose
    /// range bin is missing or partial.
    ///
    /// Fails with [`FeatureError::InvalidRange`] if `subwindow` is not one of
    /// [`OPENING_RANGE_MINUTES`], if `bar_timeframe` is not the series'
    /// minute frequency, or if it does not divide `subwindow`.
    pub fn opening_range(
        &self,
        series: &BarSeries,
        subwindow: u32,
        bar_timeframe: u32,
    ) -> Result<(FeatureColumn, FeatureColumn)> {
        if !OPENING_RANGE_MINUTES.contains(&subwindow) {
            return Err(FeatureError::InvalidRange(format!(
                "opening range subwindow {subwindow} not in {OPENING_RANGE_MINUTES:?}"
            )));
        }
        if series.frequency() != Frequency::Minutes(bar_timeframe) {
            return Err(FeatureError::InvalidRange(format!(
                "bar timeframe {bar_timeframe}m does not match series frequency {}",
                series.frequency()
            )));
        }
        if subwindow % bar_timeframe != 0 {
            return Err(FeatureError::InvalidRange(format!(
                "bar timeframe {bar_timeframe}m does not divide opening range {subwindow}m"
            )));
        }

        let high_name = format!("or{subwindow}_high");
        let low_name = format!("or{subwindow}_low");
        if series.is_empty() {
            return Ok((
                FeatureColumn::for_series(series, high_name, Vec::new())?,
                FeatureColumn::for_series(series, low_name, Vec::new())?,
            ));
        }

        let range_bars = if subwindow > bar_timeframe {
            self.resampler.resample(series, Frequency::Minutes(subwindow))?
        } else {
            series.clone()
        };
        let ranges: HashMap<NaiveDate, (f64, f64)> = range_bars
            .bars()
            .iter()
            .filter(|b| b.timestamp == self.calendar.session_open_at(b.timestamp.date()))
            .map(|b| (b.timestamp.date(), (b.high, b.low)))
            .collect();

        let window = Duration::minutes(i64::from(subwindow));
        let (highs, lows) = series
            .bars()
            .iter()
            .map(|bar| {
                let date = self.calendar.session_date(bar.timestamp);
                let known = self.calendar.in_session(bar.timestamp)
                    && bar.timestamp >= self.calendar.session_open_at(date) + window;
                match ranges.get(&date) {
                    Some(&(high, low)) if known => (high, low),
                    _ => (f64::NAN, f64::NAN),
                }
            })
            .unzip();

        Ok((
            FeatureColumn::for_series(series, high_name, highs)?,
            FeatureColumn::for_series(series, low_name, lows)?,
        ))
    }
}
