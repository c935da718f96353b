//! Exchange configuration.
//!
//! Resolved in order from:
//! 1. an explicit path handed to [`ExchangeConfig::load`]
//! 2. the `EXCHANGE_CONFIG` env var
//! 3. `./exchange.toml`
//!
//! and falls back to defaults when none exists.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::committee::policy::validate_threshold;
use crate::error::{ExchangeError, Result};
use crate::types::DataStatus;

const CONFIG_ENV: &str = "EXCHANGE_CONFIG";
const CONFIG_FILE_NAME: &str = "exchange.toml";

const DEFAULT_CURRENCY_SYMBOL: &str = "wAR";
const DEFAULT_TASK_TYPE: &str = "ZKLHEDataSharing";
const DEFAULT_COMPUTE_LIMIT: &str = "9000000000000";
const DEFAULT_MEMORY_LIMIT: &str = "512M";
const DEFAULT_THRESHOLD_T: usize = 2;
const DEFAULT_THRESHOLD_N: usize = 3;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_RESULT_TIMEOUT_MS: u64 = 10_000;

/// Committee shape: any `t` of `n` members can serve a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub t: usize,
    pub n: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            t: DEFAULT_THRESHOLD_T,
            n: DEFAULT_THRESHOLD_N,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// The only symbol prices may be quoted in.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default = "default_compute_limit")]
    pub compute_limit: String,
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    #[serde(default = "default_true")]
    pub randomize_committee: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_result_timeout")]
    pub result_timeout_ms: u64,
    /// Listing filter used by `list_data` when the caller passes none.
    #[serde(default = "default_data_status")]
    pub data_status: DataStatus,
    #[serde(default)]
    pub threshold: ThresholdConfig,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            task_type: default_task_type(),
            compute_limit: default_compute_limit(),
            memory_limit: default_memory_limit(),
            randomize_committee: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            result_timeout_ms: DEFAULT_RESULT_TIMEOUT_MS,
            data_status: DataStatus::Valid,
            threshold: ThresholdConfig::default(),
        }
    }
}

fn default_currency_symbol() -> String {
    DEFAULT_CURRENCY_SYMBOL.into()
}
fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.into()
}
fn default_compute_limit() -> String {
    DEFAULT_COMPUTE_LIMIT.into()
}
fn default_memory_limit() -> String {
    DEFAULT_MEMORY_LIMIT.into()
}
fn default_true() -> bool {
    true
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_result_timeout() -> u64 {
    DEFAULT_RESULT_TIMEOUT_MS
}
fn default_data_status() -> DataStatus {
    DataStatus::Valid
}

impl ExchangeConfig {
    /// Loads and validates the first config file found, or the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match Self::find_config_file(explicit) {
            Some(path) => {
                info!(path = %path.display(), "loading exchange config");
                Self::load_from(&path)?
            }
            None => {
                info!("no exchange config found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ExchangeError::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
            .map_err(|e| ExchangeError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    pub fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        local.exists().then_some(local)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold.t, self.threshold.n)?;
        if self.currency_symbol.is_empty() {
            return Err(ExchangeError::Config("currency_symbol must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ExchangeError::Config("poll_interval_ms must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }

    pub fn generate_sample() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| ExchangeError::Config(format!("Failed to render sample config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ExchangeConfig::from_toml(
            r#"
            result_timeout_ms = 2000

            [threshold]
            t = 3
            n = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.threshold, ThresholdConfig { t: 3, n: 5 });
        assert_eq!(config.result_timeout_ms, 2000);
        assert_eq!(config.currency_symbol, "wAR");
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = ExchangeConfig::default();
        config.threshold = ThresholdConfig { t: 4, n: 3 };
        assert!(matches!(config.validate(), Err(ExchangeError::InvalidPolicy { t: 4, n: 3 })));

        config.threshold = ThresholdConfig { t: 0, n: 3 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ExchangeConfig {
            poll_interval_ms: 0,
            ..ExchangeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ExchangeError::Config(_))));
    }

    #[test]
    fn test_sample_parses_back() {
        let sample = ExchangeConfig::generate_sample().unwrap();
        assert_eq!(ExchangeConfig::from_toml(&sample).unwrap(), ExchangeConfig::default());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange.toml");
        std::fs::write(&path, "currency_symbol = \"AO\"\nrandomize_committee = false\n").unwrap();

        let config = ExchangeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.currency_symbol, "AO");
        assert!(!config.randomize_committee);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(ExchangeConfig::load(Some(&missing)), Err(ExchangeError::Config(_))));
    }
}
