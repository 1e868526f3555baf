//! Engine configuration.
//!
//! Every knob has a default, so an absent config file is the normal case. A
//! TOML file may override any subset of fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Relative path the dataset is read from when nothing else is configured.
pub const DEFAULT_DATASET_PATH: &str = "medical_insurance.csv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delimited text file holding one row per insured subject.
    pub dataset_path: PathBuf,
    /// Training rows are down-sampled to this many when the file is larger.
    pub sample_size: usize,
    /// Seed for row sampling and for every seeded model family.
    pub seed: u64,
    /// Income assigned when the file carries no usable income values.
    pub income_fallback: f64,
    pub optimal_bmi: f64,
    /// Gap (in currency units) above which a forecast is flagged as carrying a risk premium.
    pub premium_alert_threshold: f64,
    pub gauge_ceiling: f64,
    /// Share of income spent on health, in percent, considered unaffordable.
    pub burden_alert_percent: f64,
    /// Number of rows drawn for scatter-style point clouds.
    pub scatter_sample: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            sample_size: 5000,
            seed: 42,
            income_fallback: 50_000.0,
            optimal_bmi: 22.0,
            premium_alert_threshold: 1000.0,
            gauge_ceiling: 65_000.0,
            burden_alert_percent: 10.0,
            scatter_sample: 2000,
        }
    }
}

impl EngineConfig {
    /// Reads a TOML config file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&toml_string)?;
        config.validate()?;
        log::debug!("Loaded engine config from '{}'", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sample_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.income_fallback.is_finite() && self.income_fallback > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "income_fallback",
                reason: format!("must be a positive finite number, got {}", self.income_fallback),
            });
        }
        if !(self.gauge_ceiling.is_finite() && self.gauge_ceiling > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "gauge_ceiling",
                reason: format!("must be a positive finite number, got {}", self.gauge_ceiling),
            });
        }
        for (field, value) in [
            ("optimal_bmi", self.optimal_bmi),
            ("premium_alert_threshold", self.premium_alert_threshold),
            ("burden_alert_percent", self.burden_alert_percent),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be a finite number, got {value}"),
                });
            }
        }
        Ok(())
    }

    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }
}
