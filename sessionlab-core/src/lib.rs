//! SessionLab Core: bar aggregation and causal feature derivation.
//!
//! This crate contains the feature engine:
//! - Domain types (bars, series, frequencies, feature columns)
//! - Session calendar with session-anchored bin arithmetic
//! - Resampler and causal (no look-ahead) aligner
//! - Indicator library (EMA, Wilder ATR, MACD, swing pivots)
//! - Session-relative levels and opening ranges
//! - Real Relative Strength against a reference market
//! - Feature panel builder and DataFrame conversion
//! - Data provider trait for upstream bar sources

pub mod align;
pub mod domain;
pub mod error;
pub mod features;
pub mod indicators;
pub mod io;
pub mod provider;
pub mod relative_strength;
pub mod resample;
pub mod session;

pub use align::CausalAligner;
pub use domain::{Bar, BarSeries, FeatureColumn, Frequency, PriceField};
pub use error::{FeatureError, Result};
pub use features::{FeaturePanel, SessionFeatureBuilder};
pub use relative_strength::relative_strength;
pub use resample::Resampler;
pub use session::{DstPolicy, SessionCalendar};
