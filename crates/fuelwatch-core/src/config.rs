//! Configuration types for the fuelwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Poll intervals below this floor are clamped up to it
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Default upstream records endpoint
pub const DEFAULT_FEED_URL: &str = "https://data.economie.gouv.fr/api/records/1.0/search/";

/// Default upstream dataset
pub const DEFAULT_FEED_DATASET: &str = "prix-des-carburants-en-france-flux-instantane-v2";

/// Fuel types the upstream feed reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FuelType {
    E10,
    #[serde(rename = "SP98")]
    Sp98,
    #[serde(rename = "SP95")]
    Sp95,
    E85,
    Gazole,
    #[serde(rename = "GPLc")]
    Gplc,
}

impl FuelType {
    /// Every monitorable fuel type, in the order the feed documents them
    pub const ALL: [FuelType; 6] = [
        FuelType::E10,
        FuelType::Sp98,
        FuelType::Sp95,
        FuelType::E85,
        FuelType::Gazole,
        FuelType::Gplc,
    ];

    /// Name as spelled by the feed (`carburants_disponibles` entries)
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::E10 => "E10",
            FuelType::Sp98 => "SP98",
            FuelType::Sp95 => "SP95",
            FuelType::E85 => "E85",
            FuelType::Gazole => "Gazole",
            FuelType::Gplc => "GPLc",
        }
    }

    /// Lowercase prefix used for per-fuel feed fields and log file names
    pub fn field_prefix(&self) -> &'static str {
        match self {
            FuelType::E10 => "e10",
            FuelType::Sp98 => "sp98",
            FuelType::Sp95 => "sp95",
            FuelType::E85 => "e85",
            FuelType::Gazole => "gazole",
            FuelType::Gplc => "gplc",
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|fuel| fuel.as_str() == s)
            .ok_or_else(|| {
                crate::Error::config(format!(
                    "Invalid fuel type '{}'. Please choose from the following list: {}",
                    s,
                    Self::valid_names()
                ))
            })
    }
}

/// Main fuelwatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Fuel type to monitor
    pub fuel_type: FuelType,

    /// Optional postal code scope (digits only)
    #[serde(default)]
    pub postal_code: Option<String>,

    /// Requested poll interval in seconds (clamped to [`MIN_POLL_INTERVAL_SECS`])
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Directory holding the change logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Feed source configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// Notifier configuration
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl WatchConfig {
    /// Create a new configuration with defaults for the given fuel type
    pub fn new(fuel_type: FuelType) -> Self {
        Self {
            fuel_type,
            postal_code: None,
            interval_secs: default_interval_secs(),
            data_dir: default_data_dir(),
            feed: FeedConfig::default(),
            notifier: NotifierConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Build and validate a configuration from raw command-line values
    pub fn parse(
        fuel_type: &str,
        postal_code: Option<&str>,
        interval_secs: Option<u64>,
    ) -> Result<Self, crate::Error> {
        let mut config = Self::new(fuel_type.parse()?);
        config.postal_code = postal_code.map(str::to_string);
        if let Some(interval) = interval_secs {
            config.interval_secs = interval;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the postal code scope
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Set the requested poll interval
    pub fn with_interval_secs(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if let Some(ref postal_code) = self.postal_code
            && (postal_code.is_empty() || !postal_code.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(crate::Error::config(format!(
                "Invalid postal code '{}'. Please enter a numerical value.",
                postal_code
            )));
        }

        self.feed.validate()?;
        self.notifier.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Poll interval after applying the minimum floor
    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }

    /// Scope label used in the log file name: the postal code or `all`
    pub fn scope(&self) -> &str {
        self.postal_code.as_deref().unwrap_or("all")
    }

    /// Path of the change log for this (scope, fuel type) pair
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(format!(
            "{}_{}_gas_availability_log.csv",
            self.scope(),
            self.fuel_type.field_prefix()
        ))
    }
}

fn default_interval_secs() -> u64 {
    MIN_POLL_INTERVAL_SECS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Feed source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedConfig {
    /// data.economie.gouv.fr records API
    Economie {
        /// Records search endpoint
        #[serde(default = "default_feed_url")]
        url: String,
        /// Dataset identifier
        #[serde(default = "default_feed_dataset")]
        dataset: String,
        /// Maximum rows requested per poll
        #[serde(default = "default_feed_rows")]
        rows: u32,
        /// HTTP timeout in seconds
        #[serde(default = "default_feed_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom feed source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl FeedConfig {
    /// Validate the feed configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            FeedConfig::Economie {
                url,
                rows,
                timeout_secs,
                ..
            } => {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Feed URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if *rows == 0 {
                    return Err(crate::Error::config("Feed rows must be > 0"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Feed timeout must be > 0"));
                }
                Ok(())
            }
            FeedConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom feed factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom feed config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the feed type name
    pub fn type_name(&self) -> &str {
        match self {
            FeedConfig::Economie { .. } => "economie",
            FeedConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig::Economie {
            url: default_feed_url(),
            dataset: default_feed_dataset(),
            rows: default_feed_rows(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_feed_dataset() -> String {
    DEFAULT_FEED_DATASET.to_string()
}

fn default_feed_rows() -> u32 {
    1000
}

fn default_feed_timeout_secs() -> u64 {
    30
}

/// Notifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Log signals through tracing only
    #[default]
    Log,

    /// Spawn a program per signal (e.g. a WAV player)
    Command {
        /// Program and arguments for the positive signal
        #[serde(default)]
        positive: Vec<String>,
        /// Program and arguments for the negative signal
        #[serde(default)]
        negative: Vec<String>,
    },

    /// Custom notifier
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl NotifierConfig {
    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::Log => Ok(()),
            NotifierConfig::Command { positive, negative } => {
                if positive.is_empty() && negative.is_empty() {
                    return Err(crate::Error::config(
                        "Command notifier needs a positive or a negative command",
                    ));
                }
                Ok(())
            }
            NotifierConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom notifier factory cannot be empty",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &str {
        match self {
            NotifierConfig::Log => "log",
            NotifierConfig::Command { .. } => "command",
            NotifierConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Delay before re-running the loop after a failed cycle (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Upper bound for the doubled retry delay (in seconds)
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.retry_delay_secs == 0 {
            return Err(crate::Error::config("Retry delay must be > 0"));
        }
        if self.max_retry_delay_secs < self.retry_delay_secs {
            return Err(crate::Error::config(format!(
                "Max retry delay ({}s) cannot be below retry delay ({}s)",
                self.max_retry_delay_secs, self.retry_delay_secs
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            retry_delay_secs: default_retry_delay_secs(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_max_retry_delay_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuel_type_round_trips_feed_spelling() {
        for fuel in FuelType::ALL {
            assert_eq!(fuel.as_str().parse::<FuelType>().unwrap(), fuel);
        }
        assert_eq!(FuelType::Gplc.field_prefix(), "gplc");
    }

    #[test]
    fn unknown_fuel_type_is_a_config_error() {
        let err = "diesel".parse::<FuelType>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("E10, SP98, SP95, E85, Gazole, GPLc"));

        // Names are case-sensitive, as the feed spells them
        assert!("gazole".parse::<FuelType>().is_err());
    }

    #[test]
    fn postal_code_must_be_digits() {
        assert!(WatchConfig::parse("E10", Some("75001"), None).is_ok());
        assert!(WatchConfig::parse("E10", Some("75a01"), None).is_err());
        assert!(WatchConfig::parse("E10", Some(""), None).is_err());
        assert!(WatchConfig::parse("E10", Some("-7500"), None).is_err());
    }

    #[test]
    fn interval_is_clamped_to_floor() {
        let config = WatchConfig::parse("E10", None, Some(5)).unwrap();
        assert_eq!(config.effective_interval(), Duration::from_secs(60));

        let config = WatchConfig::parse("E10", None, Some(600)).unwrap();
        assert_eq!(config.effective_interval(), Duration::from_secs(600));
    }

    #[test]
    fn log_path_is_scoped_by_postal_code_and_fuel() {
        let config = WatchConfig::new(FuelType::Sp98).with_data_dir("/tmp/fw");
        assert_eq!(
            config.log_path(),
            PathBuf::from("/tmp/fw/all_sp98_gas_availability_log.csv")
        );

        let config = config.with_postal_code("31000");
        assert_eq!(
            config.log_path(),
            PathBuf::from("/tmp/fw/31000_sp98_gas_availability_log.csv")
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: WatchConfig = serde_json::from_str(r#"{"fuel_type": "GPLc"}"#).unwrap();
        assert_eq!(config.fuel_type, FuelType::Gplc);
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.feed.type_name(), "economie");
        assert_eq!(config.notifier.type_name(), "log");
        assert!(config.validate().is_ok());

        let bad: Result<WatchConfig, _> = serde_json::from_str(r#"{"fuel_type": "diesel"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn command_notifier_requires_a_command() {
        let notifier = NotifierConfig::Command {
            positive: vec![],
            negative: vec![],
        };
        assert!(notifier.validate().is_err());

        let notifier = NotifierConfig::Command {
            positive: vec!["aplay".into(), "yena.wav".into()],
            negative: vec![],
        };
        assert!(notifier.validate().is_ok());
    }

    #[test]
    fn retry_bounds_are_checked() {
        let engine = EngineConfig {
            retry_delay_secs: 10,
            max_retry_delay_secs: 5,
            ..EngineConfig::default()
        };
        assert!(engine.validate().is_err());
    }
}
