//! Screener configuration.
//!
//! Thresholds are percentages (6.0 = 6%). Values come from [`Default`], then
//! an optional TOML file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Widest allowed gap between leg trades: one full day.
pub const MAX_TOLERANCE_MINUTES: i64 = 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Thresholds and lookahead for one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    /// Underlying symbol.
    pub ticker: String,
    /// Skip expirations further out than this many calendar days.
    #[serde(alias = "min_days_to_expiration")]
    pub max_days_to_expiration: i64,
    /// Minimum distance per day to expiration (%).
    pub min_daily_distance: f64,
    /// Minimum net premium as a share of margin (%).
    pub min_return: f64,
    /// Minimum gap between underlying price and short strike (%).
    pub min_distance: f64,
    /// Maximum gap between the two legs' last trades.
    pub tolerance_minutes: i64,
    /// Directory the CSV reports are written to.
    pub output_dir: PathBuf,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            ticker: "NVDA".to_string(),
            max_days_to_expiration: 50,
            min_daily_distance: 0.5,
            min_return: 6.0,
            min_distance: 10.0,
            tolerance_minutes: 15,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ScreenerConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Leg trade-time tolerance as a duration. Saturates for values
    /// `validate` would reject.
    pub fn tolerance(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.tolerance_minutes).unwrap_or(chrono::Duration::MAX)
    }

    /// Reject values the screener cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.trim().is_empty() {
            return Err(ConfigError::Invalid("ticker must not be empty".to_string()));
        }

        if self.max_days_to_expiration <= 0 {
            return Err(ConfigError::Invalid(format!(
                "max_days_to_expiration must be positive, got {}",
                self.max_days_to_expiration
            )));
        }

        if !(0..=MAX_TOLERANCE_MINUTES).contains(&self.tolerance_minutes) {
            return Err(ConfigError::Invalid(format!(
                "tolerance_minutes must be between 0 and {}, got {}",
                MAX_TOLERANCE_MINUTES, self.tolerance_minutes
            )));
        }

        for (name, value) in [
            ("min_daily_distance", self.min_daily_distance),
            ("min_return", self.min_return),
            ("min_distance", self.min_distance),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be a number, got {}", name, value)));
            }
        }

        Ok(())
    }
}
