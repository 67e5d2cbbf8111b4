//! Serializable pipeline configuration.
//!
//! A pipeline is described by a TOML file with four sections:
//!
//! ```toml
//! [session]
//! timezone = "America/New_York"
//! open = "09:30"
//! close = "16:00"
//!
//! [data]
//! input_dir = "data"
//! interval = "5m"
//! market = "SPY"
//! symbols = ["AAPL", "MSFT"]
//! period = "60d"
//!
//! [features]
//! emas = [8, 21, 50]
//! opening_range = [30]
//!
//! [output]
//! dir = "features"
//! format = "csv"
//! ```
//!
//! Everything except `data.market` and `data.symbols` has a default.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sessionlab_core::domain::Frequency;
use sessionlab_core::features::OPENING_RANGE_MINUTES;
use sessionlab_core::provider::RequestWindow;
use sessionlab_core::{FeatureError, SessionCalendar};

/// Deterministic content hash of a configuration.
pub type ConfigId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default)]
    pub session: SessionConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// IANA zone name; all bar timestamps are wall-clock times in this zone.
    pub timezone: String,
    /// Session open, `HH:MM`.
    pub open: String,
    /// Session close, `HH:MM`.
    pub close: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            open: "09:30".to_string(),
            close: "16:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Directory holding `{SYMBOL}_{interval}.csv` files.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Bar interval of the input files and of every output panel.
    #[serde(default = "default_interval")]
    pub interval: Frequency,

    /// Reference market symbol for relative strength.
    pub market: String,

    /// Instruments to build panels for.
    pub symbols: Vec<String>,

    /// Lookback period (`60d`, `2y`, `ytd`, `max`). Ignored when `start` is set.
    #[serde(default)]
    pub period: Option<String>,

    #[serde(default)]
    pub start: Option<NaiveDate>,

    #[serde(default)]
    pub end: Option<NaiveDate>,

    /// Generate deterministic synthetic bars when no file is found.
    #[serde(default)]
    pub synthetic: bool,

    /// Round OHLC to this many decimals after loading.
    #[serde(default = "default_round_decimals")]
    pub round_decimals: Option<u32>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_interval() -> Frequency {
    Frequency::Minutes(5)
}

fn default_round_decimals() -> Option<u32> {
    Some(2)
}

/// MACD lengths.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    pub emas: Vec<usize>,
    pub atr_length: usize,
    /// Length of the bar-level RRS (`rrs_{len}`).
    pub rrs_intraday_length: usize,
    /// Length of the daily RRS aligned onto the bars as `rrs_d1`.
    pub rrs_daily_length: usize,
    /// Extra daily bars of delay applied to `rrs_d1` before alignment.
    pub rrs_daily_shift: usize,
    /// `prev_day_{kind}` columns.
    pub previous_session: Vec<String>,
    /// `curr_day_{kind}` columns.
    pub running_session: Vec<String>,
    /// Opening-range subwindows in minutes.
    pub opening_range: Vec<u32>,
    pub macd: Option<MacdConfig>,
    pub pivot_window: Option<usize>,
    /// Keep only rows where every feature is known.
    pub drop_incomplete: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            emas: vec![8, 21, 50],
            atr_length: 12,
            rrs_intraday_length: 12,
            rrs_daily_length: 5,
            rrs_daily_shift: 0,
            previous_session: vec!["high".into(), "low".into(), "close".into()],
            running_session: vec!["open".into(), "high".into(), "low".into()],
            opening_range: vec![30],
            macd: None,
            pivot_window: None,
            drop_incomplete: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("features"),
            format: OutputFormat::Csv,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share an id.
    pub fn config_id(&self) -> Result<ConfigId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn calendar(&self) -> Result<SessionCalendar, ConfigError> {
        Ok(SessionCalendar::parse(
            &self.session.timezone,
            &self.session.open,
            &self.session.close,
        )?)
    }

    /// The requested date window relative to `today`.
    pub fn window(&self, today: NaiveDate) -> Result<RequestWindow, ConfigError> {
        Ok(RequestWindow::resolve(
            self.data.period.as_deref(),
            self.data.start,
            self.data.end,
            today,
        )?)
    }

    /// Check everything that can be checked without data.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calendar()?;

        if self.data.market.trim().is_empty() {
            return Err(ConfigError::Invalid("data.market must name a symbol".into()));
        }
        if self.data.symbols.is_empty() {
            return Err(ConfigError::Invalid("data.symbols must not be empty".into()));
        }
        if let Some(dup) = first_duplicate(&self.data.symbols) {
            return Err(ConfigError::Invalid(format!("symbol '{dup}' listed twice")));
        }

        let f = &self.features;
        let lengths = [
            ("features.atr_length", f.atr_length),
            ("features.rrs_intraday_length", f.rrs_intraday_length),
            ("features.rrs_daily_length", f.rrs_daily_length),
        ];
        for (name, value) in lengths {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if f.emas.contains(&0) {
            return Err(ConfigError::Invalid("features.emas must be positive".into()));
        }
        if let Some(dup) = first_duplicate(&f.emas) {
            return Err(ConfigError::Invalid(format!("ema length {dup} listed twice")));
        }
        if let Some(m) = f.macd {
            if m.fast == 0 || m.signal == 0 || m.fast >= m.slow {
                return Err(ConfigError::Invalid(format!(
                    "features.macd needs 0 < fast < slow and signal > 0, got ({}, {}, {})",
                    m.fast, m.slow, m.signal
                )));
            }
        }
        if f.pivot_window == Some(0) {
            return Err(ConfigError::Invalid("features.pivot_window must be positive".into()));
        }

        match self.data.interval {
            Frequency::Minutes(tf) => {
                for &sub in &f.opening_range {
                    if !OPENING_RANGE_MINUTES.contains(&sub) {
                        return Err(ConfigError::Invalid(format!(
                            "opening range {sub} not one of {OPENING_RANGE_MINUTES:?}"
                        )));
                    }
                    if sub % tf != 0 {
                        return Err(ConfigError::Invalid(format!(
                            "opening range {sub} is not a multiple of the {tf}m interval"
                        )));
                    }
                }
            }
            Frequency::Daily => {
                if !f.opening_range.is_empty() {
                    return Err(ConfigError::Invalid(
                        "opening ranges need an intraday interval".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn first_duplicate<T: PartialEq>(items: &[T]) -> Option<&T> {
    items
        .iter()
        .enumerate()
        .find(|(i, item)| items[..*i].contains(item))
        .map(|(_, item)| item)
}
