//! CausalAligner: attach a coarse-cadence feature to a finer index without look-ahead.
//!
//! For a fine timestamp `t`:
//! - `closed` is the latest coarse bin whose close is `<= t`
//! - with `lag_bins = 0` the attached value is the one at `closed`
//! - with `lag_bins = n > 0` it is the n-th coarse bin before the bin that
//!   contains `t`, capped at `closed`
//!
//! On a daily column `lag_bins = 1` therefore reads the previous session all
//! day, even after today's close. A value whose bin has not closed at `t` is
//! never attached, and the lag is counted from the calendar position of `t`
//! rather than from the labels present, so a partial trailing bin that is
//! later completed cannot change earlier results.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::{BarSeries, FeatureColumn};
use crate::error::{FeatureError, Result};
use crate::session::SessionCalendar;

#[derive(Debug, Clone, Copy)]
pub struct CausalAligner {
    calendar: SessionCalendar,
}

impl CausalAligner {
    pub fn new(calendar: SessionCalendar) -> Self {
        Self { calendar }
    }

    /// One value of `coarse` per bar of `fine`, NaN where nothing is knowable yet.
    pub fn align(&self, fine: &BarSeries, coarse: &FeatureColumn, lag_bins: usize) -> Result<FeatureColumn> {
        let fine_ts = fine.timestamps();
        let values = self.align_timestamps(&fine_ts, coarse, lag_bins)?;
        FeatureColumn::new(coarse.name(), fine.frequency(), fine_ts, values)
    }

    /// Index mapping behind [`align`](Self::align), over raw fine timestamps.
    pub fn align_timestamps(
        &self,
        fine: &[NaiveDateTime],
        coarse: &FeatureColumn,
        lag_bins: usize,
    ) -> Result<Vec<f64>> {
        let labels = coarse.timestamps();
        if let Some(w) = labels.windows(2).find(|w| w[0] >= w[1]) {
            return Err(FeatureError::MisalignedSeries(format!(
                "coarse column '{}' is not strictly increasing at {}",
                coarse.name(),
                w[1]
            )));
        }
        let frequency = coarse.frequency();
        let closes: Vec<NaiveDateTime> = labels
            .iter()
            .map(|&start| self.calendar.bin_end(start, frequency))
            .collect();

        let mut out = Vec::with_capacity(fine.len());
        let mut next_closed = 0usize;
        let mut unknown = 0usize;

        for &t in fine {
            while next_closed < closes.len() && closes[next_closed] <= t {
                next_closed += 1;
            }
            let value = match (lag_bins, next_closed.checked_sub(1)) {
                (_, None) => f64::NAN,
                (0, Some(closed)) => coarse.values()[closed],
                (lag, Some(closed)) => {
                    let current = self.calendar.bin_start(t, frequency);
                    let before = labels.partition_point(|&l| l < current);
                    before
                        .checked_sub(lag)
                        .map_or(f64::NAN, |i| coarse.values()[i.min(closed)])
                }
            };
            if value.is_nan() {
                unknown += 1;
            }
            out.push(value);
        }

        debug!(
            column = coarse.name(),
            rows = fine.len(),
            unknown,
            lag_bins,
            "aligned coarse column"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, Frequency};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn fine_series(times: &[NaiveDateTime]) -> BarSeries {
        let bars = times
            .iter()
            .map(|&t| Bar {
                timestamp: t,
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.0,
                volume: 1,
            })
            .collect();
        BarSeries::new("X", Frequency::Minutes(30), bars).unwrap()
    }

    fn daily_closes() -> FeatureColumn {
        FeatureColumn::new(
            "close_d",
            Frequency::Daily,
            vec![at(2, 0, 0), at(3, 0, 0), at(4, 0, 0)],
            vec![100.0, 105.0, 98.0],
        )
        .unwrap()
    }

    fn aligner() -> CausalAligner {
        CausalAligner::new(SessionCalendar::us_equities())
    }

    #[test]
    fn lag_zero_attaches_latest_closed_day() {
        let fine = fine_series(&[at(2, 9, 30), at(2, 15, 30), at(2, 16, 0), at(3, 9, 30), at(4, 10, 0)]);
        let out = aligner().align(&fine, &daily_closes(), 0).unwrap();
        let v = out.values();
        assert!(v[0].is_nan());
        assert!(v[1].is_nan());
        // day 2 closed at 16:00
        assert_eq!(v[2], 100.0);
        assert_eq!(v[3], 100.0);
        assert_eq!(v[4], 105.0);
    }

    #[test]
    fn lag_one_keeps_previous_session_after_close() {
        let fine = fine_series(&[at(3, 9, 30), at(3, 16, 0), at(4, 9, 30), at(4, 16, 30)]);
        let out = aligner().align(&fine, &daily_closes(), 1).unwrap();
        assert_eq!(out.values(), &[100.0, 100.0, 105.0, 105.0]);
    }

    #[test]
    fn nothing_before_first_close() {
        let fine = fine_series(&[at(1, 9, 30), at(1, 10, 0)]);
        let out = aligner().align(&fine, &daily_closes(), 0).unwrap();
        assert!(out.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn intraday_coarse_column_waits_for_bin_close() {
        let coarse = FeatureColumn::new(
            "h1",
            Frequency::Minutes(60),
            vec![at(2, 9, 30), at(2, 10, 30)],
            vec![1.0, 2.0],
        )
        .unwrap();
        let fine = fine_series(&[at(2, 9, 30), at(2, 10, 0), at(2, 10, 30), at(2, 11, 0), at(2, 11, 30)]);
        let out = aligner().align(&fine, &coarse, 0).unwrap();
        let v = out.values();
        assert!(v[0].is_nan() && v[1].is_nan());
        assert_eq!(&v[2..], &[1.0, 1.0, 2.0]);
    }

    #[test]
    fn lag_is_counted_from_the_bin_containing_t() {
        let complete = FeatureColumn::new(
            "h1",
            Frequency::Minutes(60),
            vec![at(2, 9, 30), at(2, 10, 30), at(2, 11, 30)],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        // Same grid without the still-open 11:30 bin.
        let partial = FeatureColumn::new(
            "h1",
            Frequency::Minutes(60),
            vec![at(2, 9, 30), at(2, 10, 30)],
            vec![1.0, 2.0],
        )
        .unwrap();
        let fine = fine_series(&[at(2, 11, 0), at(2, 11, 50)]);
        let a = aligner().align(&fine, &complete, 1).unwrap();
        let b = aligner().align(&fine, &partial, 1).unwrap();
        assert_eq!(a.values(), &[1.0, 2.0]);
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn unordered_coarse_column_is_rejected() {
        let coarse = FeatureColumn::new(
            "bad",
            Frequency::Daily,
            vec![at(3, 0, 0), at(2, 0, 0)],
            vec![1.0, 2.0],
        )
        .unwrap();
        let fine = fine_series(&[at(4, 9, 30)]);
        let err = aligner().align(&fine, &coarse, 0).unwrap_err();
        assert!(matches!(err, FeatureError::MisalignedSeries(_)));
    }
}
