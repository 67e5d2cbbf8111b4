//! Indicator library.
//!
//! Indicators are pure functions: bar history in, numeric series out, one
//! value per bar. Multi-series indicators (MACD, revealed pivots) are exposed
//! as separate named instances per output line, keeping the single-series
//! [`Indicator`] trait unchanged.
//!
//! Raw pivot detection ([`pivots::detect_pivots`]) looks at future bars and
//! therefore does not implement [`Indicator`]; only its revealed form does.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod pivots;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::{Macd, MacdLine};
pub use pivots::{detect_pivots, PivotKind, Pivots, RevealedPivot};

use crate::domain::Bar;

/// A causal indicator.
///
/// Takes a full bar series and produces an output series of the same length.
/// The first `lookback()` values are `f64::NAN` (warm-up).
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bar t+1 or later. Every implementation
/// must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name (e.g. "ema_21", "atr_12").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic daily bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
