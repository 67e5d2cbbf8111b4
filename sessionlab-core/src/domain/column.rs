//! FeatureColumn: a named, timestamp-aligned real-valued series.

use chrono::NaiveDateTime;

use super::{BarSeries, Frequency};
use crate::error::{FeatureError, Result};

/// A named series of feature values, one per timestamp.
///
/// NaN means "not yet knowable" or "insufficient history", never zero.
/// `frequency` is the cadence of the bins the values were computed on; the
/// causal aligner uses it to decide when each value's bin closed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    name: String,
    frequency: Frequency,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl FeatureColumn {
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if timestamps.len() != values.len() {
            return Err(FeatureError::MisalignedSeries(format!(
                "column '{name}' has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        Ok(Self {
            name,
            frequency,
            timestamps,
            values,
        })
    }

    /// Column on the index of `series`. `values` must have one entry per bar.
    pub fn for_series(series: &BarSeries, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        Self::new(name, series.frequency(), series.timestamps(), values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    /// Value at the row labelled exactly `ts`.
    pub fn value_at(&self, ts: NaiveDateTime) -> Option<f64> {
        self.timestamps
            .binary_search(&ts)
            .ok()
            .map(|i| self.values[i])
    }

    /// Number of leading NaN values (the warm-up / knowability prefix).
    pub fn nan_prefix(&self) -> usize {
        self.values.iter().take_while(|v| v.is_nan()).count()
    }

    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Delay every value by `rows` positions; the first `rows` entries become NaN.
    pub fn shifted(&self, rows: usize) -> Self {
        let n = self.values.len();
        let mut values = vec![f64::NAN; n];
        if rows < n {
            values[rows..].copy_from_slice(&self.values[..n - rows]);
        }
        Self {
            name: self.name.clone(),
            frequency: self.frequency,
            timestamps: self.timestamps.clone(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = FeatureColumn::new("x", Frequency::Daily, vec![day(2)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FeatureError::MisalignedSeries(_)));
    }

    #[test]
    fn shift_delays_values() {
        let c = FeatureColumn::new(
            "x",
            Frequency::Daily,
            vec![day(2), day(3), day(4)],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap();
        let s = c.shifted(1);
        assert!(s.values()[0].is_nan());
        assert_eq!(&s.values()[1..], &[1.0, 2.0]);
        assert_eq!(s.nan_prefix(), 1);
        assert_eq!(c.shifted(5).nan_prefix(), 3);
        assert_eq!(c.shifted(0), c);
    }

    #[test]
    fn value_lookup_by_timestamp() {
        let c = FeatureColumn::new("x", Frequency::Daily, vec![day(2), day(3)], vec![1.0, 2.0]).unwrap();
        assert_eq!(c.value_at(day(3)), Some(2.0));
        assert_eq!(c.value_at(day(9)), None);
    }
}
