//! Session calendar: trading-session window and every piece of
//! session-boundary arithmetic the feature engine needs.
//!
//! All timestamps handled by the engine are session-local wall-clock times
//! (`NaiveDateTime` in the calendar's zone). Provider data arriving in UTC is
//! converted once with [`SessionCalendar::localize`]; converting back goes
//! through [`SessionCalendar::to_utc`] with an explicit [`DstPolicy`].
//!
//! Binning rules:
//! - Minute bins are anchored at the session open of the timestamp's calendar
//!   day, not at clock-hour boundaries. A 60-minute bin built from 30-minute
//!   bars therefore starts at 09:30, 10:30, ... for a 09:30 open. For 5/15/30
//!   minute bins the anchor coincides with clock alignment.
//! - A minute bin that would run past the session close ends at the close
//!   (the 15:30 bin of a 90-minute grid closes at 16:00).
//! - A daily bin is labelled at local midnight of the session date and closes
//!   at the session close.

use chrono::offset::LocalResult;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::domain::{Bar, BarSeries, Frequency};
use crate::error::{FeatureError, Result};

/// How to resolve local times that fall in a DST fold or gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    Strict,
    /// For ambiguous local times pick the earlier instant.
    PreferEarliest,
    /// For ambiguous local times pick the later instant.
    PreferLatest,
}

/// Regular-trading-hours window for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCalendar {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl SessionCalendar {
    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime) -> Result<Self> {
        if open >= close {
            return Err(FeatureError::InvalidRange(format!(
                "session open {open} must be before close {close}"
            )));
        }
        Ok(Self { tz, open, close })
    }

    /// US equities regular session: America/New_York, 09:30–16:00.
    pub fn us_equities() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            open: clock(9, 30),
            close: clock(16, 0),
        }
    }

    /// Build from an IANA zone name and `HH:MM` clock times.
    pub fn parse(tz: &str, open: &str, close: &str) -> Result<Self> {
        let tz: Tz = tz
            .parse()
            .map_err(|_| FeatureError::InvalidRange(format!("unknown time zone '{tz}'")))?;
        let parse_clock = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
                .map_err(|_| FeatureError::InvalidRange(format!("invalid clock time '{s}'")))
        };
        Self::new(tz, parse_clock(open)?, parse_clock(close)?)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn open_time(&self) -> NaiveTime {
        self.open
    }

    pub fn close_time(&self) -> NaiveTime {
        self.close
    }

    /// Length of the regular session.
    pub fn session_length(&self) -> Duration {
        self.close - self.open
    }

    /// True if `ts` falls in `[open, close)` on its day.
    pub fn in_session(&self, ts: NaiveDateTime) -> bool {
        let t = ts.time();
        t >= self.open && t < self.close
    }

    /// Grouping key for prior/current-day logic: the local calendar date.
    pub fn session_date(&self, ts: NaiveDateTime) -> NaiveDate {
        ts.date()
    }

    pub fn session_open_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.open)
    }

    pub fn session_close_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.close)
    }

    /// Weekday filter. Exchange holidays are not modelled.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether a bar labelled `ts` at `frequency` takes part in session-relative
    /// features. Every daily bar is a session by definition.
    pub fn is_session_bar(&self, ts: NaiveDateTime, frequency: Frequency) -> bool {
        match frequency {
            Frequency::Daily => true,
            Frequency::Minutes(_) => self.in_session(ts),
        }
    }

    /// First in-session bar of `date`, if the series has one.
    pub fn first_bar_of_session<'s>(&self, series: &'s BarSeries, date: NaiveDate) -> Option<&'s Bar> {
        let bars = series.bars();
        match series.frequency() {
            Frequency::Daily => {
                let idx = bars.partition_point(|b| b.timestamp.date() < date);
                bars.get(idx).filter(|b| b.timestamp.date() == date)
            }
            Frequency::Minutes(_) => {
                let open_at = self.session_open_at(date);
                let idx = bars.partition_point(|b| b.timestamp < open_at);
                bars.get(idx)
                    .filter(|b| b.timestamp.date() == date && self.in_session(b.timestamp))
            }
        }
    }

    /// Label of the bin at `frequency` that contains `ts`.
    pub fn bin_start(&self, ts: NaiveDateTime, frequency: Frequency) -> NaiveDateTime {
        match frequency {
            Frequency::Daily => ts.date().and_time(NaiveTime::MIN),
            Frequency::Minutes(m) => {
                let anchor = self.session_open_at(ts.date());
                let width = i64::from(m);
                let k = (ts - anchor).num_minutes().div_euclid(width);
                anchor + Duration::minutes(k * width)
            }
        }
    }

    /// Instant at which the bin labelled `start` closes.
    pub fn bin_end(&self, start: NaiveDateTime, frequency: Frequency) -> NaiveDateTime {
        match frequency {
            Frequency::Daily => self.session_close_at(start.date()),
            Frequency::Minutes(m) => {
                let end = start + Duration::minutes(i64::from(m));
                let close_at = self.session_close_at(start.date());
                if start < close_at && end > close_at {
                    close_at
                } else {
                    end
                }
            }
        }
    }

    /// Clock label of the last in-session bar at `frequency`
    /// (15:55 for 5m, 15:30 for 30m/60m/90m with a 09:30–16:00 session).
    pub fn last_bar_label(&self, frequency: Frequency) -> Option<NaiveTime> {
        frequency.minutes()?;
        let last_minute = self.session_close_at(NaiveDate::default()) - Duration::minutes(1);
        Some(self.bin_start(last_minute, frequency).time())
    }

    /// Keep only in-session bars (daily series are returned unchanged).
    pub fn filter_session(&self, series: &BarSeries) -> BarSeries {
        let frequency = series.frequency();
        series.filtered(|b| self.is_session_bar(b.timestamp, frequency))
    }

    /// Convert a UTC instant to session-local wall time.
    pub fn localize(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.tz).naive_local()
    }

    /// Convert session-local wall time back to UTC.
    ///
    /// Nonexistent local times (spring-forward gap) always fail.
    pub fn to_utc(&self, local: NaiveDateTime, policy: DstPolicy) -> Result<DateTime<Utc>> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(a, b) => match policy {
                DstPolicy::PreferEarliest => Ok(a.with_timezone(&Utc)),
                DstPolicy::PreferLatest => Ok(b.with_timezone(&Utc)),
                DstPolicy::Strict => Err(FeatureError::InvalidRange(format!(
                    "ambiguous local time {local} in {}",
                    self.tz
                ))),
            },
            LocalResult::None => Err(FeatureError::InvalidRange(format!(
                "nonexistent local time {local} in {}",
                self.tz
            ))),
        }
    }
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self::us_equities()
    }
}
