//! Serializable pipeline configuration.
//!
//! Every field has a default, so an absent config file means "run with the
//! stock settings". Components receive the resolved values explicitly.

use btcdb_core::domain::Instrument;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration for the daily update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// IANA timezone that defines "today".
    pub timezone: String,
    pub store: StoreConfig,
    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    /// Delay after each instrument request.
    pub instrument_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub coingecko_url: String,
    pub coin_id: String,
    pub vs_currency: String,
    pub yahoo_url: String,
    pub timeout_secs: u64,
    /// Symbol overrides keyed by column name, e.g. `price_gold = "XAUUSD=X"`.
    pub symbols: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_prefix: String,
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub retention_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Caracas".to_string(),
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            sources: SourcesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db").join("db.parquet"),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 60,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            instrument_delay_secs: 15,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            coingecko_url: btcdb_core::data::coingecko::DEFAULT_API_URL.to_string(),
            coin_id: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            yahoo_url: btcdb_core::data::yahoo::DEFAULT_CHART_URL.to_string(),
            timeout_secs: 30,
            symbols: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_prefix: "log_btcdb_".to_string(),
            level: "info".to_string(),
            retention_days: 15,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::Invalid("sources.timeout_secs must be positive".into()));
        }
        self.timezone()?;
        self.tickers()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// Instrument → symbol, in column order, with overrides applied.
    pub fn tickers(&self) -> Result<Vec<(Instrument, String)>, ConfigError> {
        for key in self.sources.symbols.keys() {
            key.parse::<Instrument>()
                .map_err(|e| ConfigError::Invalid(format!("sources.symbols: {e}")))?;
        }

        Ok(Instrument::ALL
            .into_iter()
            .map(|i| {
                let symbol = self
                    .sources
                    .symbols
                    .get(i.column())
                    .cloned()
                    .unwrap_or_else(|| i.default_symbol().to_string());
                (i, symbol)
            })
            .collect())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            backoff: Duration::from_secs(self.retry.backoff_secs),
        }
    }

    pub fn instrument_delay(&self) -> Duration {
        Duration::from_secs(self.pacing.instrument_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_daily_cadence() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().max_attempts, 3);
        assert_eq!(config.retry_policy().backoff, Duration::from_secs(60));
        assert_eq!(config.instrument_delay(), Duration::from_secs(15));
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::Caracas);
        assert_eq!(config.store.path, PathBuf::from("db").join("db.parquet"));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        let config = PipelineConfig::from_toml(
            r#"
timezone = "UTC"

[retry]
backoff_secs = 5

[sources.symbols]
price_gold = "XAUUSD=X"
"#,
        )
        .unwrap();

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_secs, 5);
        assert_eq!(config.timezone().unwrap(), chrono_tz::UTC);

        let tickers = config.tickers().unwrap();
        assert_eq!(tickers[0], (Instrument::Gold, "XAUUSD=X".to_string()));
        assert_eq!(tickers[1], (Instrument::DowJones, "^DJI".to_string()));
        assert_eq!(tickers.len(), 5);
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let result = PipelineConfig::from_toml(r#"timezone = "Mars/Olympus""#);
        assert!(matches!(result, Err(ConfigError::UnknownTimezone(_))));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let result = PipelineConfig::from_toml("[retry]\nmax_attempts = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_symbol_column() {
        let result = PipelineConfig::from_toml("[sources.symbols]\nprice_silver = \"SI=F\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = PipelineConfig::from_toml("[retry]\nattempts = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = PipelineConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }
}
