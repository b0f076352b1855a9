//! # Dashboard Configuration
//!
//! All timings accept humantime syntax (`"10m"`, `"1500ms"`, `"5min"`), the same
//! format used for provider intervals. Every field has a default, so an empty JSON
//! object is a valid configuration.
//!
//! ```rust
//! use dioxus_stats_dashboard::config::DashboardConfig;
//! use std::time::Duration;
//!
//! let config = DashboardConfig::from_json_str(r#"{ "refresh_interval": "1m" }"#).unwrap();
//! assert_eq!(config.refresh_interval, Duration::from_secs(60));
//! assert_eq!(config.freshness_window, Duration::from_secs(600));
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, platform::config as defaults};

/// Environment variable overriding the stats endpoint
pub const ENDPOINT_ENV: &str = "DASHBOARD_STATS_URL";

/// Environment variable setting a fetch timeout (humantime syntax)
pub const FETCH_TIMEOUT_ENV: &str = "DASHBOARD_FETCH_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// URL of the analytics stats endpoint
    pub endpoint: String,
    /// Cached snapshots younger than this skip the network
    #[serde(with = "humantime_duration")]
    pub freshness_window: Duration,
    /// Period of the forced background refresh
    #[serde(with = "humantime_duration")]
    pub refresh_interval: Duration,
    /// Length of a count-up transition
    #[serde(with = "humantime_duration")]
    pub animation_duration: Duration,
    /// Time between animation frames
    #[serde(with = "humantime_duration")]
    pub frame_interval: Duration,
    /// Start delay added per card position
    #[serde(with = "humantime_duration")]
    pub card_stagger: Duration,
    /// Per-request timeout. Unset means no timeout.
    #[serde(with = "humantime_duration::option")]
    pub fetch_timeout: Option<Duration>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DEFAULT_STATS_ENDPOINT.to_string(),
            freshness_window: defaults::DEFAULT_FRESHNESS_WINDOW,
            refresh_interval: defaults::DEFAULT_REFRESH_INTERVAL,
            animation_duration: defaults::DEFAULT_ANIMATION_DURATION,
            frame_interval: defaults::DEFAULT_FRAME_INTERVAL,
            card_stagger: defaults::DEFAULT_CARD_STAGGER,
            fetch_timeout: None,
        }
    }
}

impl DashboardConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json_str(&content)
    }

    /// Defaults overridden by `DASHBOARD_STATS_URL` and `DASHBOARD_FETCH_TIMEOUT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply environment-style overrides looked up through `lookup`
    pub fn with_overrides<L>(mut self, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(timeout) = lookup(FETCH_TIMEOUT_ENV) {
            let timeout = humantime::parse_duration(&timeout).map_err(|e| {
                ConfigError::Parse(format!("{FETCH_TIMEOUT_ENV}: invalid duration format: {e}"))
            })?;
            self.fetch_timeout = Some(timeout);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".to_string()));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "refresh_interval must be greater than zero".to_string(),
            ));
        }
        if self.frame_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "frame_interval must be greater than zero".to_string(),
            ));
        }
        if self.fetch_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::Invalid(
                "fetch_timeout must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Serde adapter reading and writing durations in humantime syntax
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text)
            .map_err(|e| D::Error::custom(format!("invalid duration format '{text}': {e}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(duration) => super::serialize(duration, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| {
                    humantime::parse_duration(&text).map_err(|e| {
                        D::Error::custom(format!("invalid duration format '{text}': {e}"))
                    })
                })
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = DashboardConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.freshness_window, Duration::from_secs(600));
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert_eq!(config.animation_duration, Duration::from_millis(1500));
        assert_eq!(config.fetch_timeout, None);
    }

    #[test]
    fn test_humantime_fields() {
        let config = DashboardConfig::from_json_str(
            r#"{
                "endpoint": "https://stats.example.com/api/analytics/stats",
                "freshness_window": "2m",
                "animation_duration": "800ms",
                "fetch_timeout": "10s"
            }"#,
        )
        .unwrap();
        assert_eq!(config.freshness_window, Duration::from_secs(120));
        assert_eq!(config.animation_duration, Duration::from_millis(800));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_config_serializes_back_to_humantime() {
        let json = serde_json::to_string(&DashboardConfig::default()).unwrap();
        assert!(json.contains(r#""freshness_window":"10m""#));
        assert!(json.contains(r#""fetch_timeout":null"#));
        let parsed = DashboardConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, DashboardConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{ "refresh_interval": "soon" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{ "endpoint": "  " }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{ "frame_interval": "0s" }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = DashboardConfig::default()
            .with_overrides(|name| match name {
                ENDPOINT_ENV => Some("https://override.example.com/stats".to_string()),
                FETCH_TIMEOUT_ENV => Some("30s".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.endpoint, "https://override.example.com/stats");
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(30)));

        let error = DashboardConfig::default()
            .with_overrides(|name| (name == FETCH_TIMEOUT_ENV).then(|| "later".to_string()))
            .unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = DashboardConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(error, ConfigError::Io(_)));
    }
}
