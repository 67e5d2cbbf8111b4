//! Tabular (polars DataFrame) conversion for bar series and feature panels.
//!
//! Layout: `timestamp` (Datetime, milliseconds, session-local wall time),
//! `open`/`high`/`low`/`close` (f64), `volume` (u64), then one f64 column per
//! feature. Timestamps survive the round-trip to the millisecond.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::domain::{Bar, BarSeries, Frequency};
use crate::error::{FeatureError, Result};
use crate::features::FeaturePanel;

fn table_err(context: &str) -> impl Fn(PolarsError) -> FeatureError + '_ {
    move |e| FeatureError::Table(format!("{context}: {e}"))
}

fn timestamp_column(timestamps: impl Iterator<Item = NaiveDateTime>) -> Result<Column> {
    let millis: Vec<i64> = timestamps.map(|t| t.and_utc().timestamp_millis()).collect();
    Column::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(table_err("timestamp cast"))
}

fn bar_columns(series: &BarSeries) -> Result<Vec<Column>> {
    let bars = series.bars();
    Ok(vec![
        timestamp_column(bars.iter().map(|b| b.timestamp))?,
        Column::new("open".into(), series.opens()),
        Column::new("high".into(), series.highs()),
        Column::new("low".into(), series.lows()),
        Column::new("close".into(), series.closes()),
        Column::new(
            "volume".into(),
            bars.iter().map(|b| b.volume).collect::<Vec<u64>>(),
        ),
    ])
}

/// Convert a bar series to a DataFrame.
pub fn bars_to_dataframe(series: &BarSeries) -> Result<DataFrame> {
    DataFrame::new(bar_columns(series)?).map_err(table_err("dataframe creation"))
}

/// Convert a feature panel (bars plus every feature column) to a DataFrame.
pub fn panel_to_dataframe(panel: &FeaturePanel) -> Result<DataFrame> {
    let mut columns = bar_columns(panel.series())?;
    columns.extend(
        panel
            .columns()
            .iter()
            .map(|c| Column::new(c.name().into(), c.values().to_vec())),
    );
    DataFrame::new(columns).map_err(table_err("dataframe creation"))
}

/// Read a bar series back from a DataFrame with the layout above.
///
/// Numeric columns are cast, so integer prices or signed volumes are
/// accepted. The result is validated like any provider input.
pub fn dataframe_to_series(df: &DataFrame, symbol: &str, frequency: Frequency) -> Result<BarSeries> {
    let column = |name: &str, dtype: DataType| -> Result<Column> {
        df.column(name)
            .map_err(table_err("missing column"))?
            .cast(&dtype)
            .map_err(table_err(name))
    };

    let timestamps = column("timestamp", DataType::Int64)?;
    let opens = column("open", DataType::Float64)?;
    let highs = column("high", DataType::Float64)?;
    let lows = column("low", DataType::Float64)?;
    let closes = column("close", DataType::Float64)?;
    let volumes = column("volume", DataType::UInt64)?;

    let ts_ca = timestamps.i64().map_err(table_err("timestamp column type"))?;
    let open_ca = opens.f64().map_err(table_err("open column type"))?;
    let high_ca = highs.f64().map_err(table_err("high column type"))?;
    let low_ca = lows.f64().map_err(table_err("low column type"))?;
    let close_ca = closes.f64().map_err(table_err("close column type"))?;
    let vol_ca = volumes.u64().map_err(table_err("volume column type"))?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let millis = ts_ca.get(i).ok_or_else(|| FeatureError::SchemaViolation {
            row: i,
            reason: "null timestamp".into(),
        })?;
        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| FeatureError::SchemaViolation {
                row: i,
                reason: format!("timestamp {millis}ms out of range"),
            })?
            .naive_utc();

        bars.push(Bar {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }

    BarSeries::new(symbol, frequency, bars)
}
