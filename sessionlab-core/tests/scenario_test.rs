//! End-to-end scenarios: small hand-checked series run through the public API.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sessionlab_core::domain::{Bar, BarSeries, Frequency};
use sessionlab_core::io::{bars_to_dataframe, dataframe_to_series, panel_to_dataframe};
use sessionlab_core::{
    CausalAligner, FeatureColumn, FeatureError, FeaturePanel, Resampler, SessionCalendar,
    SessionFeatureBuilder,
};

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn bar(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp,
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// Full 5-minute sessions; each bar's range is centred on `base + i * step`.
fn sessions_5m(days: &[u32], base: f64, step: f64) -> BarSeries {
    let bars = days
        .iter()
        .flat_map(|&d| {
            (0..78).map(move |i| {
                let p = base + i as f64 * step + d as f64;
                bar(at(d, 9, 30) + Duration::minutes(5 * i), p, p + 0.4, p - 0.4, p + 0.1)
            })
        })
        .collect();
    BarSeries::new("AAA", Frequency::Minutes(5), bars).unwrap()
}

#[test]
fn previous_close_on_day_c_is_day_b() {
    let daily = BarSeries::new(
        "AAA",
        Frequency::Daily,
        vec![
            bar(at(2, 0, 0), 99.0, 101.0, 98.0, 100.0),
            bar(at(3, 0, 0), 100.0, 106.0, 99.0, 105.0),
            bar(at(4, 0, 0), 104.0, 104.0, 97.0, 98.0),
        ],
    )
    .unwrap();
    let panel = FeaturePanel::new(daily, SessionCalendar::us_equities())
        .with_previous_session("close")
        .unwrap();
    let prev = panel.column("prev_day_close").unwrap();
    assert_eq!(prev.value_at(at(4, 0, 0)), Some(105.0));
    assert_eq!(prev.value_at(at(3, 0, 0)), Some(100.0));
    assert!(prev.value_at(at(2, 0, 0)).unwrap().is_nan());
}

#[test]
fn previous_close_on_intraday_day_c_is_day_b() {
    let series = sessions_5m(&[2, 3, 4], 100.0, 0.0);
    let prev = SessionFeatureBuilder::new(SessionCalendar::us_equities())
        .previous_session_value(&series, "close")
        .unwrap();
    let day_b_close = 100.0 + 3.0 + 0.1;
    for ts in [at(4, 9, 30), at(4, 12, 0), at(4, 15, 55)] {
        assert_eq!(prev.value_at(ts), Some(day_b_close));
    }
}

#[test]
fn opening_range_fifteen_on_five_minute_bars() {
    let series = sessions_5m(&[2], 100.0, 0.5);
    let (high, low) = SessionFeatureBuilder::new(SessionCalendar::us_equities())
        .opening_range(&series, 15, 5)
        .unwrap();

    for ts in [at(2, 9, 30), at(2, 9, 35), at(2, 9, 40)] {
        assert!(high.value_at(ts).unwrap().is_nan());
        assert!(low.value_at(ts).unwrap().is_nan());
    }
    // Bars 09:30, 09:35, 09:40 centred on 102, 102.5, 103.
    let window = &series.bars()[..3];
    let max = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let min = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    assert_eq!(high.value_at(at(2, 9, 45)), Some(max));
    assert_eq!(low.value_at(at(2, 9, 45)), Some(min));
}

#[test]
fn sixty_minute_bars_from_thirty_start_at_the_open() {
    let calendar = SessionCalendar::us_equities();
    let thirty = Resampler::new(calendar)
        .resample(&sessions_5m(&[2, 3], 100.0, 0.1), Frequency::Minutes(30))
        .unwrap();
    let hourly = Resampler::new(calendar)
        .resample(&thirty, Frequency::Minutes(60))
        .unwrap();
    let day2: Vec<_> = hourly
        .timestamps()
        .into_iter()
        .filter(|t| t.date() == at(2, 0, 0).date())
        .map(|t| t.time())
        .collect();
    assert_eq!(day2.first(), Some(&at(2, 9, 30).time()));
    assert_eq!(day2.last(), calendar.last_bar_label(Frequency::Minutes(60)).as_ref());
    assert_eq!(day2.len(), 7);
}

#[test]
fn after_hours_bars_never_reach_the_last_hourly_bin() {
    let calendar = SessionCalendar::us_equities();
    let mut bars: Vec<Bar> = (0..13)
        .map(|i| {
            let p = 100.0 + i as f64;
            bar(at(2, 9, 30) + Duration::minutes(30 * i), p, p + 1.0, p - 1.0, p + 0.5)
        })
        .collect();
    bars.push(bar(at(2, 16, 0), 113.0, 500.0, 112.0, 113.5));
    bars.push(bar(at(2, 16, 30), 113.5, 114.0, 113.0, 113.8));
    let thirty = BarSeries::new("AAA", Frequency::Minutes(30), bars).unwrap();

    let hourly = Resampler::new(calendar)
        .resample(&thirty, Frequency::Minutes(60))
        .unwrap();
    let last = hourly.last().unwrap();
    assert_eq!(last.timestamp, at(2, 15, 30));
    assert_eq!(last.high, 113.0);

    let highs = FeatureColumn::for_series(&hourly, "h1_high", hourly.highs()).unwrap();
    let aligned = CausalAligner::new(calendar).align(&thirty, &highs, 0).unwrap();
    assert_eq!(aligned.value_at(at(2, 16, 0)), Some(113.0));
    assert_eq!(aligned.value_at(at(2, 16, 30)), Some(113.0));
    assert!(aligned.values().iter().all(|v| v.is_nan() || *v < 500.0));
}

#[test]
fn relative_strength_of_a_series_against_itself() {
    let series = sessions_5m(&[2, 3], 50.0, 0.05);
    let panel = FeaturePanel::new(series.clone(), SessionCalendar::us_equities())
        .with_relative_strength(&series, 12, 0)
        .unwrap();
    let rrs = panel.column("rrs_12").unwrap();
    assert_eq!(rrs.nan_prefix(), 12);
    assert!(rrs.values()[12..].iter().all(|v| v.abs() < 1e-9));
}

#[test]
fn relative_strength_needs_a_shared_calendar() {
    let subject = sessions_5m(&[2], 50.0, 0.05);
    let market = sessions_5m(&[9], 50.0, 0.05);
    let err = FeaturePanel::new(subject, SessionCalendar::us_equities())
        .with_relative_strength(&market, 12, 0)
        .unwrap_err();
    assert!(matches!(err, FeatureError::MisalignedSeries(_)));
}

#[test]
fn full_panel_exports_to_a_table() {
    let market = sessions_5m(&[2, 3, 4], 400.0, 0.02);
    let series = sessions_5m(&[2, 3, 4], 100.0, 0.07);
    let panel = FeaturePanel::new(series, SessionCalendar::us_equities())
        .with_ema(8)
        .and_then(|p| p.with_atr(12))
        .and_then(|p| p.with_previous_session("high"))
        .and_then(|p| p.with_running_session("low"))
        .and_then(|p| p.with_opening_range(30))
        .and_then(|p| p.with_relative_strength(&market, 12, 0))
        .unwrap();

    let df = panel_to_dataframe(&panel).unwrap();
    assert_eq!(df.height(), 3 * 78);
    assert_eq!(df.width(), 6 + 7);

    let complete = panel.complete_rows();
    // Day 2 has no previous session; day 3 waits for its opening range.
    assert_eq!(complete.series().first().unwrap().timestamp, at(3, 10, 0));
}

#[test]
fn rounded_series_survives_a_table_roundtrip() {
    let series = sessions_5m(&[2], 100.123, 0.0137).rounded(2).unwrap();
    let df = bars_to_dataframe(&series).unwrap();
    let back = dataframe_to_series(&df, "AAA", Frequency::Minutes(5)).unwrap();
    assert_eq!(back, series);
    assert_eq!(back.bars()[0].open, 102.12);
}
