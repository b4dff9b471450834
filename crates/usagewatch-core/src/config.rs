use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

const APP_DIR: &str = "usagewatch";

// Upper bounds for configured durations
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;
const MAX_BACKOFF_SECONDS: u64 = 24 * 60 * 60;
const MAX_LOOKBACK_HOURS: u64 = 31 * 24;

/// Get the local data directory for usagewatch.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push(APP_DIR);
    Ok(path)
}

/// Default location of the config file.
///
/// # Errors
///
/// Returns an error if the config directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Failed to get config dir"))?;
    path.push(APP_DIR);
    path.push("config.toml");
    Ok(path)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub collector: CollectorConfig,
    pub schedule: ScheduleConfig,
    pub usage: UsageConfig,
    /// Display name overrides keyed by application id
    pub names: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub endpoint: String,
    /// Request timeout; the HTTP client default applies when unset
    pub timeout_seconds: Option<u64>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://127.0.0.1:5000/receive_usage"),
            timeout_seconds: None,
        }
    }
}

impl CollectorConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_minutes: u64,
    pub flex_minutes: u64,
    pub initial_backoff_seconds: u64,
    pub max_backoff_seconds: u64,
    pub max_attempts: u32,
    pub connectivity_poll_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            flex_minutes: 5,
            initial_backoff_seconds: 30,
            max_backoff_seconds: 5 * 60 * 60,
            max_attempts: 10,
            connectivity_poll_seconds: 30,
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    #[must_use]
    pub const fn flex(&self) -> Duration {
        Duration::from_secs(self.flex_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Foreground interval log; defaults to `<data_dir>/usage.jsonl`
    pub log_path: Option<PathBuf>,
    pub lookback_hours: Option<u64>,
}

impl UsageConfig {
    /// Resolve the usage log location.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory is unknown.
    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join("usage.jsonl")),
        }
    }

    #[must_use]
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_hours.unwrap_or(24).saturating_mul(60 * 60))
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the scheduler and delivery client rely on.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let endpoint = &self.collector.endpoint;
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            anyhow::bail!("collector.endpoint must be an absolute http(s) URL, got {endpoint:?}");
        }
        if reqwest::Url::parse(endpoint).is_err() {
            anyhow::bail!("collector.endpoint is not a valid URL: {endpoint:?}");
        }

        let schedule = &self.schedule;
        if schedule.interval_minutes < 15 {
            anyhow::bail!(
                "schedule.interval_minutes must be at least 15, got {}",
                schedule.interval_minutes
            );
        }
        if schedule.interval_minutes > MAX_INTERVAL_MINUTES {
            anyhow::bail!(
                "schedule.interval_minutes must be at most {MAX_INTERVAL_MINUTES}, got {}",
                schedule.interval_minutes
            );
        }
        if schedule.flex_minutes > schedule.interval_minutes {
            anyhow::bail!("schedule.flex_minutes cannot exceed schedule.interval_minutes");
        }
        if schedule.max_attempts == 0 {
            anyhow::bail!("schedule.max_attempts must be at least 1");
        }
        if schedule.max_backoff_seconds > MAX_BACKOFF_SECONDS {
            anyhow::bail!(
                "schedule.max_backoff_seconds must be at most {MAX_BACKOFF_SECONDS}, got {}",
                schedule.max_backoff_seconds
            );
        }
        if schedule.initial_backoff_seconds > schedule.max_backoff_seconds {
            anyhow::bail!(
                "schedule.initial_backoff_seconds cannot exceed schedule.max_backoff_seconds"
            );
        }
        if !(1..=MAX_BACKOFF_SECONDS).contains(&schedule.connectivity_poll_seconds) {
            anyhow::bail!(
                "schedule.connectivity_poll_seconds must be between 1 and {MAX_BACKOFF_SECONDS}"
            );
        }
        match self.usage.lookback_hours {
            Some(0) => anyhow::bail!("usage.lookback_hours must be greater than zero"),
            Some(hours) if hours > MAX_LOOKBACK_HOURS => anyhow::bail!(
                "usage.lookback_hours must be at most {MAX_LOOKBACK_HOURS}, got {hours}"
            ),
            _ => {}
        }
        Ok(())
    }

    /// Serialize the effective configuration for display.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(
            config.collector.endpoint,
            "http://127.0.0.1:5000/receive_usage"
        );
        assert_eq!(config.schedule.interval(), Duration::from_secs(900));
        assert_eq!(config.schedule.flex(), Duration::from_secs(300));
        assert_eq!(config.usage.lookback(), Duration::from_secs(86_400));
        assert!(config.collector.timeout().is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[collector]
endpoint = "https://collector.example.com/receive_usage"
timeout_seconds = 10

[names]
"com.example.notes" = "Notes"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.collector.endpoint,
            "https://collector.example.com/receive_usage"
        );
        assert_eq!(config.collector.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.schedule.interval_minutes, 15);
        assert_eq!(
            config.names.get("com.example.notes").map(String::as_str),
            Some("Notes")
        );
    }

    #[test]
    fn test_rejects_short_interval() {
        let mut config = Config::default();
        config.schedule.interval_minutes = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_flex_larger_than_interval() {
        let mut config = Config::default();
        config.schedule.flex_minutes = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_endpoint() {
        let mut config = Config::default();
        config.collector.endpoint = "/receive_usage".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_lookback() {
        let mut config = Config::default();
        config.usage.lookback_hours = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_durations() {
        let mut config = Config::default();
        config.schedule.interval_minutes = u64::MAX / 2;
        assert!(config.validate().is_err());
        assert_eq!(config.schedule.interval(), Duration::from_secs(u64::MAX));

        let mut config = Config::default();
        config.schedule.max_backoff_seconds = MAX_BACKOFF_SECONDS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.schedule.connectivity_poll_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.usage.lookback_hours = Some(u64::MAX);
        assert!(config.validate().is_err());
        assert_eq!(config.usage.lookback(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_huge_interval_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\ninterval_minutes = 9223372036854775807").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_upper_bounds_are_inclusive() {
        let mut config = Config::default();
        config.schedule.interval_minutes = MAX_INTERVAL_MINUTES;
        config.schedule.max_backoff_seconds = MAX_BACKOFF_SECONDS;
        config.usage.lookback_hours = Some(MAX_LOOKBACK_HOURS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_log_path() {
        let config = UsageConfig {
            log_path: Some(PathBuf::from("/var/lib/usage.jsonl")),
            lookback_hours: Some(12),
        };
        assert_eq!(
            config.log_path().unwrap(),
            PathBuf::from("/var/lib/usage.jsonl")
        );
        assert_eq!(config.lookback(), Duration::from_secs(12 * 3600));
    }
}
