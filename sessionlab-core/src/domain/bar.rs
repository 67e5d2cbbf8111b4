//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single interval.
///
/// `timestamp` is the bar's label: the start of its interval, in the
/// session's local wall-clock time. The owning [`BarSeries`](super::BarSeries)
/// and [`SessionCalendar`](crate::session::SessionCalendar) supply the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: `low <= min(open, close) <= max(open, close) <= high`
    /// with strictly positive prices.
    pub fn is_sane(&self) -> bool {
        self.violation().is_none()
    }

    /// Describe the first schema invariant this bar breaks, if any.
    pub fn violation(&self) -> Option<String> {
        if self.is_void() {
            return Some("NaN in OHLC".to_string());
        }
        if !(self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0) {
            return Some(format!(
                "non-positive price (o={}, h={}, l={}, c={})",
                self.open, self.high, self.low, self.close
            ));
        }
        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Some(format!(
                "low <= min(open,close) <= max(open,close) <= high violated (o={}, h={}, l={}, c={})",
                self.open, self.high, self.low, self.close
            ));
        }
        None
    }

    /// Round OHLC to `decimals` places. Volume and timestamp are unchanged.
    pub fn rounded(&self, decimals: u32) -> Bar {
        let scale = 10f64.powi(decimals as i32);
        let round = |v: f64| (v * scale).round() / scale;
        Bar {
            timestamp: self.timestamp,
            open: round(self.open),
            high: round(self.high),
            low: round(self.low),
            close: round(self.close),
            volume: self.volume,
        }
    }
}
