//! Criterion benchmarks for SessionLab hot paths.
//!
//! Benchmarks:
//! 1. Resampling 5-minute sessions to 60-minute and daily bins
//! 2. Causal alignment of a daily column onto the intraday index
//! 3. Indicator stack (EMA, ATR, MACD, revealed pivots)
//! 4. Full feature panel (indicators, session levels, opening range, RRS)

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sessionlab_core::domain::{Bar, BarSeries, FeatureColumn, Frequency};
use sessionlab_core::indicators::{Atr, Ema, Indicator, Macd, RevealedPivot};
use sessionlab_core::{CausalAligner, FeaturePanel, Resampler, SessionCalendar};

const BARS_PER_SESSION: usize = 78;

// ── Helpers ──────────────────────────────────────────────────────────

fn session_open(day: usize) -> NaiveDateTime {
    // 2024-01-01 is a Monday; skip weekends so every session is a trading day.
    let week = (day / 5) as i64;
    let weekday = (day % 5) as i64;
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + Duration::days(week * 7 + weekday)
}

fn make_series(symbol: &str, sessions: usize, phase: f64) -> BarSeries {
    let bars = (0..sessions)
        .flat_map(|day| {
            (0..BARS_PER_SESSION).map(move |i| {
                let k = (day * BARS_PER_SESSION + i) as f64;
                let close = 100.0 + (k * 0.05 + phase).sin() * 10.0;
                let open = close - 0.2;
                Bar {
                    timestamp: session_open(day) + Duration::minutes(5 * i as i64),
                    open,
                    high: close + 0.6,
                    low: open - 0.6,
                    close,
                    volume: 10_000 + (k as u64 % 5_000),
                }
            })
        })
        .collect();
    BarSeries::new(symbol, Frequency::Minutes(5), bars).unwrap()
}

// ── 1. Resampling ────────────────────────────────────────────────────

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    let resampler = Resampler::new(SessionCalendar::us_equities());

    for &sessions in &[20, 100, 250] {
        let series = make_series("BENCH", sessions, 0.0);
        for (label, target) in [("60m", Frequency::Minutes(60)), ("daily", Frequency::Daily)] {
            group.bench_with_input(BenchmarkId::new(label, sessions), &series, |b, s| {
                b.iter(|| resampler.resample(black_box(s), target).unwrap());
            });
        }
    }

    group.finish();
}

// ── 2. Causal alignment ──────────────────────────────────────────────

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("causal_align");
    let calendar = SessionCalendar::us_equities();
    let aligner = CausalAligner::new(calendar);

    for &sessions in &[20, 100, 250] {
        let series = make_series("BENCH", sessions, 0.0);
        let daily = Resampler::new(calendar)
            .resample(&series, Frequency::Daily)
            .unwrap();
        let column = FeatureColumn::for_series(&daily, "close_d", daily.closes()).unwrap();
        group.bench_with_input(BenchmarkId::new("daily_lag1", sessions), &series, |b, s| {
            b.iter(|| aligner.align(black_box(s), black_box(&column), 1).unwrap());
        });
    }

    group.finish();
}

// ── 3. Indicator stack ───────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    let stack: Vec<Box<dyn Indicator>> = vec![
        Box::new(Ema::new(8)),
        Box::new(Ema::new(21)),
        Box::new(Ema::new(50)),
        Box::new(Atr::new(12)),
        Box::new(Macd::line(12, 26, 9)),
        Box::new(Macd::signal(12, 26, 9)),
        Box::new(Macd::histogram(12, 26, 9)),
        Box::new(RevealedPivot::high(5).unwrap()),
        Box::new(RevealedPivot::low(5).unwrap()),
    ];

    for &sessions in &[20, 100, 250] {
        let series = make_series("BENCH", sessions, 0.0);
        group.bench_with_input(BenchmarkId::new("full_stack_9", sessions), &series, |b, s| {
            b.iter(|| {
                for indicator in &stack {
                    black_box(indicator.compute(black_box(s.bars())));
                }
            });
        });
    }

    group.finish();
}

// ── 4. Feature panel ─────────────────────────────────────────────────

fn bench_panel(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_panel");
    group.sample_size(20);
    let calendar = SessionCalendar::us_equities();

    for &sessions in &[20, 100] {
        let market = make_series("SPY", sessions, 1.3);
        let series = make_series("BENCH", sessions, 0.0);
        group.bench_with_input(BenchmarkId::new("typical", sessions), &series, |b, s| {
            b.iter(|| {
                FeaturePanel::new(s.clone(), calendar)
                    .with_ema(8)
                    .and_then(|p| p.with_ema(21))
                    .and_then(|p| p.with_atr(12))
                    .and_then(|p| p.with_previous_session("high"))
                    .and_then(|p| p.with_previous_session("low"))
                    .and_then(|p| p.with_running_session("open"))
                    .and_then(|p| p.with_opening_range(30))
                    .and_then(|p| p.with_relative_strength(black_box(&market), 12, 0))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resample,
    bench_align,
    bench_indicators,
    bench_panel
);
criterion_main!(benches);
