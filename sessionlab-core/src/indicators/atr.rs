//! Wilder Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! TR[0] has no previous close and is left undefined (NaN).
//! ATR[length] = mean(TR[1..=length]); afterwards
//! ATR[i] = ATR[i-1] + (TR[i] - ATR[i-1]) / length.
//! Lookback: length.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    length: usize,
    name: String,
}

impl Atr {
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "ATR length must be >= 1");
        Self {
            length,
            name: format!("atr_{length}"),
        }
    }
}

/// True Range series. `TR[0]` is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if !(h.is_nan() || l.is_nan() || pc.is_nan()) {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }
    tr
}

/// Wilder smoothing (alpha = 1/length).
///
/// Seeded with the mean of the first `length` consecutive valid values; NaN
/// after the seed taints every later value.
pub fn wilder_smooth(values: &[f64], length: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if length == 0 {
        return result;
    }

    // First run of `length` consecutive non-NaN values.
    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        run = if v.is_nan() { 0 } else { run + 1 };
        if run == length {
            seed_end = Some(i + 1);
            break;
        }
    }
    let Some(seed_end) = seed_end else {
        return result;
    };

    let seed = values[seed_end - length..seed_end].iter().sum::<f64>() / length as f64;
    result[seed_end - 1] = seed;

    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = prev + (values[i] - prev) / length as f64;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.length)
    }
}
