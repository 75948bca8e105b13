//! Dashboard configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Johns Hopkins CSSE time-series directory.
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Settings for the data pipeline and the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the four remote CSV files.
    pub base_url: String,
    /// Local mirror directory; when set, files are read from here instead of HTTP.
    pub data_dir: Option<PathBuf>,
    /// Snapshot file of the merged table.
    pub snapshot_path: PathBuf,
    /// Snapshots older than this are refetched on the next request.
    pub snapshot_max_age: Duration,
    /// Interval of the forced background refresh.
    pub refresh_interval: Duration,
    /// HTTP request timeout.
    pub fetch_timeout: Duration,
    /// Optional CSV of per-state policy dates.
    pub policy_events_path: Option<PathBuf>,
    /// Country selected at startup.
    pub default_country: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: None,
            snapshot_path: PathBuf::from("covid_snapshot.bin.gz"),
            snapshot_max_age: Duration::from_secs(3600),
            refresh_interval: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(60),
            policy_events_path: None,
            default_country: "US".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `COVID_BASE_URL`        | JHU CSSE time series     |
    /// | `COVID_DATA_DIR`        | unset (HTTP)             |
    /// | `SNAPSHOT_PATH`         | `covid_snapshot.bin.gz`  |
    /// | `SNAPSHOT_MAX_AGE_SECS` | `3600`                   |
    /// | `REFRESH_INTERVAL_SECS` | `3600`                   |
    /// | `FETCH_TIMEOUT_SECS`    | `60`                     |
    /// | `POLICY_EVENTS_PATH`    | unset                    |
    /// | `DEFAULT_COUNTRY`       | `US`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secs = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match text(name) {
                None => Ok(default),
                Some(value) => value
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
            }
        };

        let config = Self {
            base_url: text("COVID_BASE_URL").unwrap_or(defaults.base_url),
            data_dir: text("COVID_DATA_DIR").map(PathBuf::from),
            snapshot_path: text("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            snapshot_max_age: secs("SNAPSHOT_MAX_AGE_SECS", defaults.snapshot_max_age)?,
            refresh_interval: secs("REFRESH_INTERVAL_SECS", defaults.refresh_interval)?,
            fetch_timeout: secs("FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?,
            policy_events_path: text("POLICY_EVENTS_PATH").map(PathBuf::from),
            default_country: text("DEFAULT_COUNTRY").unwrap_or(defaults.default_country),
        };

        if config.refresh_interval.is_zero() {
            return Err(ConfigError::Zero("REFRESH_INTERVAL_SECS"));
        }
        if config.fetch_timeout.is_zero() {
            return Err(ConfigError::Zero("FETCH_TIMEOUT_SECS"));
        }

        Ok(config)
    }
}
