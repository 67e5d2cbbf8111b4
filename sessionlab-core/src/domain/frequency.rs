//! Nominal bar frequency.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Nominal sampling frequency of a [`BarSeries`](super::BarSeries).
///
/// Intraday frequencies are whole minutes. `Daily` is one bar per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    Minutes(u32),
    Daily,
}

impl Frequency {
    /// Length of one bar in minutes, `None` for daily bars.
    pub fn minutes(self) -> Option<u32> {
        match self {
            Frequency::Minutes(m) => Some(m),
            Frequency::Daily => None,
        }
    }

    /// Wall-clock span of one intraday bar.
    pub fn duration(self) -> Option<Duration> {
        self.minutes().map(|m| Duration::minutes(i64::from(m)))
    }

    pub fn is_intraday(self) -> bool {
        matches!(self, Frequency::Minutes(_))
    }

    /// True if bars at `self` can be built by aggregating bars at `other`.
    ///
    /// Minute targets must be a strict integer multiple of the source.
    /// Daily is coarser than every minute frequency; nothing is coarser than daily.
    pub fn is_coarser_than(self, other: Frequency) -> bool {
        match (self, other) {
            (Frequency::Minutes(target), Frequency::Minutes(source)) => {
                target > source && target % source == 0
            }
            (Frequency::Daily, Frequency::Minutes(_)) => true,
            (_, Frequency::Daily) => false,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Minutes(m) => write!(f, "{m}m"),
            Frequency::Daily => write!(f, "1d"),
        }
    }
}

/// Error parsing a frequency string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency string '{0}' (expected e.g. 5m, 30min, 1h, 1d)")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let err = || ParseFrequencyError(s.to_string());

        if raw == "d" || raw == "1d" || raw == "day" || raw == "daily" {
            return Ok(Frequency::Daily);
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?;
        let (digits, unit) = raw.split_at(split);
        let amount: u32 = digits.parse().map_err(|_| err())?;
        if amount == 0 {
            return Err(err());
        }

        match unit {
            "m" | "min" | "t" => Ok(Frequency::Minutes(amount)),
            "h" => Ok(Frequency::Minutes(amount * 60)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ParseFrequencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}
