//! BarSeries: an ordered, validated OHLCV sequence at a nominal frequency.

use chrono::NaiveDateTime;
use std::collections::HashSet;

use super::{Bar, Frequency};
use crate::error::{FeatureError, Result};

/// Immutable, time-indexed OHLCV sequence.
///
/// Invariants enforced at construction:
/// - timestamps are strictly increasing (no duplicates, no reordering)
/// - every bar is sane (`low <= min(open,close) <= max(open,close) <= high`, positive prices)
///
/// Gaps (non-trading periods) are allowed. There is no mutable access to the
/// bars; every transformation returns a new series.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    frequency: Frequency,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate `bars` and build a series.
    ///
    /// Fails with [`FeatureError::SchemaViolation`] naming the first offending row.
    pub fn new(symbol: impl Into<String>, frequency: Frequency, bars: Vec<Bar>) -> Result<Self> {
        for (row, bar) in bars.iter().enumerate() {
            if let Some(reason) = bar.violation() {
                return Err(FeatureError::SchemaViolation { row, reason });
            }
            if row > 0 && bars[row - 1].timestamp >= bar.timestamp {
                return Err(FeatureError::SchemaViolation {
                    row,
                    reason: format!(
                        "timestamp {} not after previous {}",
                        bar.timestamp,
                        bars[row - 1].timestamp
                    ),
                });
            }
        }

        Ok(Self {
            symbol: symbol.into(),
            frequency,
            bars,
        })
    }

    /// Build from bars already known to satisfy the invariants (aggregation output).
    pub(crate) fn from_validated(symbol: &str, frequency: Frequency, bars: Vec<Bar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self {
            symbol: symbol.to_string(),
            frequency,
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Index of the bar labelled exactly `ts`.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        self.bars.binary_search_by_key(&ts, |b| b.timestamp).ok()
    }

    /// A new series holding the first `n` bars (or all of them if shorter).
    pub fn head(&self, n: usize) -> BarSeries {
        let n = n.min(self.bars.len());
        Self::from_validated(&self.symbol, self.frequency, self.bars[..n].to_vec())
    }

    /// A new series holding only bars for which `keep` is true.
    pub fn filtered(&self, mut keep: impl FnMut(&Bar) -> bool) -> BarSeries {
        let bars = self.bars.iter().filter(|b| keep(b)).cloned().collect();
        Self::from_validated(&self.symbol, self.frequency, bars)
    }

    /// A new series with OHLC rounded to `decimals` places.
    ///
    /// The rounded bars are validated again: a price below half a unit of the
    /// last kept decimal rounds to zero and fails with
    /// [`FeatureError::SchemaViolation`].
    pub fn rounded(&self, decimals: u32) -> Result<BarSeries> {
        let bars = self.bars.iter().map(|b| b.rounded(decimals)).collect();
        Self::new(self.symbol.clone(), self.frequency, bars)
    }

    /// Restrict both series to their common timestamps (inner join).
    ///
    /// Returns `None` if the frequencies differ or no timestamp is shared.
    pub fn intersect(&self, other: &BarSeries) -> Option<(BarSeries, BarSeries)> {
        if self.frequency != other.frequency {
            return None;
        }
        let ours: HashSet<NaiveDateTime> = self.bars.iter().map(|b| b.timestamp).collect();
        let common: HashSet<NaiveDateTime> = other
            .bars
            .iter()
            .map(|b| b.timestamp)
            .filter(|ts| ours.contains(ts))
            .collect();
        if common.is_empty() {
            return None;
        }
        let left = self.filtered(|b| common.contains(&b.timestamp));
        let right = other.filtered(|b| common.contains(&b.timestamp));
        Some((left, right))
    }
}
