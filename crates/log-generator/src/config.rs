//! Configuration loading for the generator.
//!
//! Configuration is layered with figment, later sources winning:
//! 1. Compiled defaults
//! 2. Config file: `log-generator.toml`, or the path in
//!    `LOG_GENERATOR_CONFIG_FILE` (optional)
//! 3. Environment variables with the `LOG_GENERATOR_` prefix
//!
//! | Variable | Config Path | Description |
//! |----------|-------------|-------------|
//! | `LOG_GENERATOR_SERVICE_NAME` | `service.name` | `service.name` resource attribute |
//! | `LOG_GENERATOR_SERVICE_VERSION` | `service.version` | `service.version` resource attribute |
//! | `LOG_GENERATOR_INTERVAL_MIN` | `interval.min` | Shortest pause in milliseconds |
//! | `LOG_GENERATOR_INTERVAL_MAX` | `interval.max` | Longest pause in milliseconds |
//! | `LOG_GENERATOR_SEED` | `seed` | Seed for a reproducible random source |
//!
//! Exporter settings are not read here; see `opentelemetry-configuration`.

use crate::error::GeneratorError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "log-generator.toml";
const CONFIG_PATH_VAR: &str = "LOG_GENERATOR_CONFIG_FILE";
const ENV_PREFIX: &str = "LOG_GENERATOR_";

/// Top-level generator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service identification.
    pub service: ServiceConfig,
    /// Pause between iterations.
    pub interval: IntervalConfig,
    /// Seed for the random source. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl Config {
    /// Loads configuration from the default file location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails or the interval is inverted.
    pub fn load() -> Result<Self, GeneratorError> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(path)
    }

    /// Loads configuration using a custom config file path.
    ///
    /// A missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails or the interval is inverted.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, GeneratorError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if config_path.as_ref().exists() {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidInterval`] when `interval.min`
    /// exceeds `interval.max`.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.interval.min > self.interval.max {
            return Err(GeneratorError::InvalidInterval {
                min: self.interval.min,
                max: self.interval.max,
            });
        }
        Ok(())
    }
}

/// Service identification attached to all telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Value of the `service.name` resource attribute.
    pub name: String,
    /// Value of the `service.version` resource attribute.
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: crate::SERVICE_NAME.to_string(),
            version: crate::SERVICE_VERSION.to_string(),
        }
    }
}

/// Bounds of the uniformly drawn pause between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Shortest pause in milliseconds.
    #[serde(with = "duration_ms")]
    pub min: Duration,
    /// Longest pause in milliseconds.
    #[serde(with = "duration_ms")]
    pub max: Duration,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(2),
            max: Duration::from_secs(5),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
