//! Configuration management with validation and defaults.

use crate::games::curve::CurveParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub curve: CurveParams,
    pub limits: LimitsConfig,
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub bind_port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/casino_data".to_string(),
        }
    }
}

/// Wagering limits enforced before any funds move.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum stake for a single bet (decimal string in config
    /// files, e.g. "100").
    pub max_bet_amount: crate::amount::Amount,
    /// Maximum number of bets on one roulette spin.
    pub max_bets_per_round: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_bet_amount: crate::amount::Amount::from_minor(100 * crate::amount::SCALE),
            max_bets_per_round: 20,
        }
    }
}

impl CasinoConfig {
    /// Load from a TOML file; missing sections fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            ConfigError::Io(format!("{}: {e}", path.as_ref().display()))
        })?;
        let config: CasinoConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.bind_port == 0 {
            return Err(ConfigError::Invalid("api.bind_port must be > 0".into()));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.request_timeout_secs must be > 0".into(),
            ));
        }
        if self.storage.data_directory.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.data_directory must not be empty".into(),
            ));
        }
        self.curve.validate().map_err(ConfigError::Invalid)?;
        if self.limits.max_bet_amount.is_zero() {
            return Err(ConfigError::Invalid(
                "limits.max_bet_amount must be positive".into(),
            ));
        }
        if self.limits.max_bets_per_round == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_bets_per_round must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.bind_address, self.api.bind_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
