//! Structured error types for the feature engine.
//!
//! Every variant is raised synchronously at the call that detects the
//! violation. Numeric edge cases (zero ATR, insufficient warm-up) are not
//! errors: they surface as NaN in the output series.

use thiserror::Error;

use crate::domain::Frequency;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeatureError {
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("invalid frequency: {to} is not coarser than {from}")]
    InvalidFrequency { from: Frequency, to: Frequency },

    #[error("invalid field '{field}' (allowed: {allowed})")]
    InvalidField { field: String, allowed: String },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("schema violation at row {row}: {reason}")]
    SchemaViolation { row: usize, reason: String },

    #[error("table conversion failed: {0}")]
    Table(String),
}

impl FeatureError {
    pub(crate) fn invalid_field(field: &str, allowed: &[&str]) -> Self {
        FeatureError::InvalidField {
            field: field.to_string(),
            allowed: allowed.join(", "),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;
