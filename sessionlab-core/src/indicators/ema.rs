//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (length + 1).
//! Seed: SMA of the first `length` values, counted from the first non-NaN input.
//! Lookback: length - 1 (for a series without a NaN prefix).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    length: usize,
    name: String,
}

impl Ema {
    pub fn new(length: usize) -> Self {
        assert!(length >= 1, "EMA length must be >= 1");
        Self {
            length,
            name: format!("ema_{length}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.length)
    }
}

/// EMA over an arbitrary series.
///
/// A leading NaN prefix (another indicator's warm-up) is skipped and the seed
/// window starts at the first valid value. NaN inside the seed window leaves
/// the whole output NaN; NaN after the seed taints every later value.
pub fn ema_of_series(values: &[f64], length: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if length == 0 {
        return result;
    }

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let seed_end = start + length;
    if seed_end > n {
        return result;
    }

    let window = &values[start..seed_end];
    if window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed = window.iter().sum::<f64>() / length as f64;
    result[seed_end - 1] = seed;

    let alpha = 2.0 / (length as f64 + 1.0);
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
