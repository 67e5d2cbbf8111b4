//! Swing pivots, as a two-phase computation.
//!
//! Detect (non-causal): bar `i` is a pivot high iff `high[i]` is strictly
//! greater than every high in `[i-window, i)` and in `(i, i+window]`; pivot
//! lows mirror this on `low`. A pivot at `i` is only decidable once bar
//! `i+window` exists, so [`detect_pivots`] output must never be fed to a
//! causal consumer directly.
//!
//! Reveal (causal): shift the detections forward by at least `window` bars.
//! [`RevealedPivot`] is the only pivot type that implements [`Indicator`].

use super::Indicator;
use crate::domain::Bar;
use crate::error::{FeatureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PivotKind::High => "high",
            PivotKind::Low => "low",
        }
    }
}

/// Raw pivot detections: the pivot price at each pivot index, NaN elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivots {
    window: usize,
    highs: Vec<f64>,
    lows: Vec<f64>,
}

/// Strict-extreme test of `values[i]` against both neighbourhoods.
fn is_extreme(values: &[f64], i: usize, window: usize, beats: impl Fn(f64, f64) -> bool) -> bool {
    let center = values[i];
    if center.is_nan() {
        return false;
    }
    values[i - window..i]
        .iter()
        .chain(&values[i + 1..=i + window])
        .all(|&v| !v.is_nan() && beats(center, v))
}

/// Detect symmetric swing pivots. Looks `window` bars into the future.
///
/// Bars without a full neighbourhood on both sides are never pivots.
pub fn detect_pivots(high: &[f64], low: &[f64], window: usize) -> Pivots {
    assert!(window >= 1, "pivot window must be >= 1");
    assert_eq!(high.len(), low.len(), "high/low length mismatch");
    let n = high.len();
    let mut highs = vec![f64::NAN; n];
    let mut lows = vec![f64::NAN; n];

    if n > 2 * window {
        for i in window..n - window {
            if is_extreme(high, i, window, |c, v| c > v) {
                highs[i] = high[i];
            }
            if is_extreme(low, i, window, |c, v| c < v) {
                lows[i] = low[i];
            }
        }
    }

    Pivots { window, highs, lows }
}

impl Pivots {
    pub fn window(&self) -> usize {
        self.window
    }

    /// Detections at their own (future-dependent) index.
    pub fn raw(&self, kind: PivotKind) -> &[f64] {
        match kind {
            PivotKind::High => &self.highs,
            PivotKind::Low => &self.lows,
        }
    }

    /// Detections delayed by `shift` bars, the earliest point each is known.
    ///
    /// Fails with [`FeatureError::InvalidRange`] if `shift < window`.
    pub fn reveal(&self, kind: PivotKind, shift: usize) -> Result<Vec<f64>> {
        if shift < self.window {
            return Err(FeatureError::InvalidRange(format!(
                "pivot reveal shift {shift} is below the confirmation window {}",
                self.window
            )));
        }
        let raw = self.raw(kind);
        let n = raw.len();
        let mut out = vec![f64::NAN; n];
        if shift < n {
            out[shift..].copy_from_slice(&raw[..n - shift]);
        }
        Ok(out)
    }
}

/// Most recent revealed pivot price, carried forward until the next one.
#[derive(Debug, Clone)]
pub struct RevealedPivot {
    kind: PivotKind,
    window: usize,
    shift: usize,
    name: String,
}

impl RevealedPivot {
    /// Fails with [`FeatureError::InvalidRange`] if `shift < window` or `window == 0`.
    pub fn new(kind: PivotKind, window: usize, shift: usize) -> Result<Self> {
        if window == 0 {
            return Err(FeatureError::InvalidRange("pivot window must be >= 1".into()));
        }
        if shift < window {
            return Err(FeatureError::InvalidRange(format!(
                "pivot reveal shift {shift} is below the confirmation window {window}"
            )));
        }
        Ok(Self {
            kind,
            window,
            shift,
            name: format!("pivot_{}_{window}", kind.as_str()),
        })
    }

    pub fn high(window: usize) -> Result<Self> {
        Self::new(PivotKind::High, window, window)
    }

    pub fn low(window: usize) -> Result<Self> {
        Self::new(PivotKind::Low, window, window)
    }
}

impl Indicator for RevealedPivot {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window + self.shift
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let pivots = detect_pivots(&high, &low, self.window);
        let Ok(mut revealed) = pivots.reveal(self.kind, self.shift) else {
            return vec![f64::NAN; bars.len()];
        };
        let mut last = f64::NAN;
        for v in revealed.iter_mut() {
            if v.is_nan() {
                *v = last;
            } else {
                last = *v;
            }
        }
        revealed
    }
}
