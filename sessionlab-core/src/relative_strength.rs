//! Real Relative Strength (RRS): a subject's move against the move the market
//! implies for it, both normalised by Wilder ATR.
//!
//! ```text
//! market_return  = market.close[t] - market.close[t - length]
//! subject_return = subject.close[t] - subject.close[t - length]
//! power_index    = market_return / market_atr
//! expected_move  = power_index * subject_atr
//! score          = round((subject_return - expected_move) / subject_atr, 3)
//! ```
//!
//! A zero ATR (frozen or halted market) yields NaN or ±inf. Those values are
//! returned as-is; consumers must filter non-finite scores themselves.

use tracing::warn;

use crate::domain::{BarSeries, FeatureColumn};
use crate::error::{FeatureError, Result};
use crate::indicators::{Atr, Indicator};

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// `close[t] - close[t - length]`, NaN for the first `length` bars.
fn trailing_return(closes: &[f64], length: usize) -> Vec<f64> {
    (0..closes.len())
        .map(|t| {
            if t >= length {
                closes[t] - closes[t - length]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// RRS scores on the intersection of two aligned series.
fn scores(subject: &BarSeries, market: &BarSeries, length: usize) -> Vec<f64> {
    let atr = Atr::new(length);
    let subject_atr = atr.compute(subject.bars());
    let market_atr = atr.compute(market.bars());
    let subject_return = trailing_return(&subject.closes(), length);
    let market_return = trailing_return(&market.closes(), length);

    (0..subject.len())
        .map(|t| {
            let power_index = market_return[t] / market_atr[t];
            let expected_move = power_index * subject_atr[t];
            round3((subject_return[t] - expected_move) / subject_atr[t])
        })
        .collect()
}

/// Relative strength of `subject` against `market`, one value per subject bar.
///
/// Only timestamps present in both series are scored; other subject bars read
/// NaN. `shift` delays the result by that many subject bars. The column is
/// named `rrs_{length}`.
///
/// Fails with [`FeatureError::MisalignedSeries`] if the frequencies differ or
/// the series share no timestamp, and [`FeatureError::InvalidRange`] for a
/// zero `length`.
pub fn relative_strength(
    subject: &BarSeries,
    market: &BarSeries,
    length: usize,
    shift: usize,
) -> Result<FeatureColumn> {
    if length == 0 {
        return Err(FeatureError::InvalidRange("rrs length must be >= 1".into()));
    }
    let (subject_common, market_common) = subject.intersect(market).ok_or_else(|| {
        FeatureError::MisalignedSeries(format!(
            "'{}' ({}) and '{}' ({}) share no timestamps",
            subject.symbol(),
            subject.frequency(),
            market.symbol(),
            market.frequency()
        ))
    })?;

    if subject_common.len() < subject.len() || market_common.len() < market.len() {
        warn!(
            subject = subject.symbol(),
            market = market.symbol(),
            subject_rows = subject.len(),
            market_rows = market.len(),
            common_rows = subject_common.len(),
            "relative strength computed on intersected timestamps"
        );
    }

    let common_scores = scores(&subject_common, &market_common, length);

    // Back onto the subject's own index; both timestamp lists are sorted.
    let mut values = vec![f64::NAN; subject.len()];
    let mut j = 0usize;
    let common_bars = subject_common.bars();
    for (i, bar) in subject.bars().iter().enumerate() {
        if j < common_bars.len() && common_bars[j].timestamp == bar.timestamp {
            values[i] = common_scores[j];
            j += 1;
        }
    }

    let column = FeatureColumn::for_series(subject, format!("rrs_{length}"), values)?;
    Ok(if shift > 0 { column.shifted(shift) } else { column })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Frequency};
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(i)
    }

    fn series(symbol: &str, closes: &[f64], offset: i64) -> BarSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: day(i as i64 + offset),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 100,
            })
            .collect();
        BarSeries::new(symbol, Frequency::Daily, bars).unwrap()
    }

    fn walk(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.9).sin() * 3.0 + i as f64 * step).collect()
    }

    #[test]
    fn self_relative_strength_is_zero() {
        let s = series("SPY", &walk(30, 0.3), 0);
        let rrs = relative_strength(&s, &s, 5, 0).unwrap();
        assert_eq!(rrs.name(), "rrs_5");
        assert_eq!(rrs.nan_prefix(), 5);
        for v in &rrs.values()[5..] {
            assert!(v.abs() < 1e-9, "got {v}");
        }
    }

    #[test]
    fn outperforming_subject_scores_positive() {
        let market = series("SPY", &vec![100.0; 20], 0);
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * i as f64).collect();
        let subject = series("AAA", &rising, 0);
        let rrs = relative_strength(&subject, &market, 3, 0).unwrap();
        // Flat market: score = subject_return / subject_atr
        assert!(rrs.values()[3..].iter().all(|v| *v > 0.0));
    }

    #[test]
    fn scores_are_rounded_to_three_decimals() {
        let market = series("SPY", &walk(20, 0.1), 0);
        let subject = series("AAA", &walk(20, 0.7), 0);
        let rrs = relative_strength(&subject, &market, 4, 0).unwrap();
        for v in rrs.values().iter().filter(|v| v.is_finite()) {
            assert!(((v * 1000.0).round() - v * 1000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn shift_delays_scores() {
        let s = series("SPY", &walk(15, 0.2), 0);
        let m = series("QQQ", &walk(15, 0.4), 0);
        let plain = relative_strength(&s, &m, 3, 0).unwrap();
        let shifted = relative_strength(&s, &m, 3, 2).unwrap();
        assert_eq!(shifted.nan_prefix(), plain.nan_prefix() + 2);
        assert_eq!(shifted.values()[10], plain.values()[8]);
    }

    #[test]
    fn missing_market_rows_read_nan() {
        let subject = series("AAA", &walk(12, 0.5), 0);
        let market = series("SPY", &walk(10, 0.2), 2);
        let rrs = relative_strength(&subject, &market, 2, 0).unwrap();
        assert_eq!(rrs.len(), 12);
        assert!(rrs.values()[0].is_nan() && rrs.values()[1].is_nan());
        // common index starts at subject row 2; warm-up of 2 rows follows
        assert!(rrs.values()[3].is_nan());
        assert!(rrs.values()[4].is_finite());
    }

    #[test]
    fn disjoint_series_are_misaligned() {
        let subject = series("AAA", &walk(5, 0.5), 0);
        let market = series("SPY", &walk(5, 0.5), 100);
        let err = relative_strength(&subject, &market, 2, 0).unwrap_err();
        assert!(matches!(err, FeatureError::MisalignedSeries(_)));
    }

    #[test]
    fn zero_atr_is_not_finite() {
        let bars = (0..8)
            .map(|i| Bar {
                timestamp: day(i),
                open: 50.0,
                high: 50.0,
                low: 50.0,
                close: 50.0,
                volume: 0,
            })
            .collect();
        let frozen = BarSeries::new("HALT", Frequency::Daily, bars).unwrap();
        let rrs = relative_strength(&frozen, &frozen, 3, 0).unwrap();
        assert!(rrs.values().iter().all(|v| !v.is_finite()));
    }
}
