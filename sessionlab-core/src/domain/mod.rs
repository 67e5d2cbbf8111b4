//! Domain types for SessionLab

pub mod bar;
pub mod column;
pub mod frequency;
pub mod series;

pub use bar::Bar;
pub use column::FeatureColumn;
pub use frequency::{Frequency, ParseFrequencyError};
pub use series::BarSeries;

/// A price field of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }

    pub fn value(self, bar: &Bar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
        }
    }

    /// Parse a case-insensitive field name, restricted to `allowed`.
    pub fn parse_among(kind: &str, allowed: &[PriceField]) -> crate::error::Result<Self> {
        let names: Vec<&str> = allowed.iter().map(|f| f.as_str()).collect();
        let lowered = kind.trim().to_ascii_lowercase();
        allowed
            .iter()
            .copied()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| crate::error::FeatureError::invalid_field(kind, &names))
    }
}
