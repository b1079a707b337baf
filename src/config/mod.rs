//! Configuration management.
//!
//! # Example TOML
//!
//! ```toml
//! data_dir = "/var/lib/lifeline"
//!
//! [messages]
//! alert_text = "Help Needed, I am in danger. Here is My Current Location"
//! maps_base_url = "https://www.google.com/maps"
//! fallback_name = "Unknown"
//!
//! [fanout]
//! max_concurrent_targets = 16
//!
//! [location]
//! enabled = true
//! latitude = 31.5
//! longitude = 74.3
//!
//! [logging]
//! format = "json"
//! level = "lifeline=debug"
//! file = "/var/log/lifeline.log"
//! ```

mod fanout;

pub use fanout::FanoutConfig;

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default alert phrase.
pub const DEFAULT_ALERT_TEXT: &str = "Help Needed, I am in danger. Here is My Current Location";
/// Default maps link base.
pub const DEFAULT_MAPS_BASE_URL: &str = "https://www.google.com/maps";
/// Display name used when the sender has no profile.
pub const DEFAULT_FALLBACK_NAME: &str = "Unknown";
/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "lifeline.db";

/// Main configuration for lifeline.
#[derive(Debug, Clone)]
pub struct LifelineConfig {
    /// Directory holding the `SQLite` database.
    pub data_dir: PathBuf,
    /// Outgoing message texts.
    pub messages: MessageSettings,
    /// Fan-out concurrency.
    pub fanout: FanoutConfig,
    /// Location source.
    pub location: LocationSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Outgoing message texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSettings {
    /// Fixed emergency phrase.
    pub alert_text: String,
    /// Base of the maps link; `?q=lat,lon` is appended.
    pub maps_base_url: String,
    /// Sender name used when the profile lookup fails.
    pub fallback_name: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            alert_text: DEFAULT_ALERT_TEXT.to_string(),
            maps_base_url: DEFAULT_MAPS_BASE_URL.to_string(),
            fallback_name: DEFAULT_FALLBACK_NAME.to_string(),
        }
    }
}

/// Location source settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSettings {
    /// Whether location access is granted.
    pub enabled: bool,
    /// Default latitude.
    pub latitude: Option<f64>,
    /// Default longitude.
    pub longitude: Option<f64>,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            latitude: None,
            longitude: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive.
    pub level: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Messages section.
    pub messages: Option<ConfigFileMessages>,
    /// Fan-out section.
    pub fanout: Option<ConfigFileFanout>,
    /// Location section.
    pub location: Option<ConfigFileLocation>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Messages section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMessages {
    /// Alert phrase.
    pub alert_text: Option<String>,
    /// Maps link base.
    pub maps_base_url: Option<String>,
    /// Fallback sender name.
    pub fallback_name: Option<String>,
}

/// Fan-out section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFanout {
    /// Max concurrent targets.
    pub max_concurrent_targets: Option<usize>,
}

/// Location section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLocation {
    /// Whether location access is granted.
    pub enabled: Option<bool>,
    /// Default latitude.
    pub latitude: Option<f64>,
    /// Default longitude.
    pub longitude: Option<f64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<String>,
    /// Filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for LifelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            messages: MessageSettings::default(),
            fanout: FanoutConfig::default(),
            location: LocationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".lifeline"),
        |dirs| dirs.data_dir().join("lifeline"),
    )
}

impl LifelineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not valid configuration.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("config file: {e}")))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`~/.config/lifeline/config.toml` on
    /// Linux). Returns default configuration if no file is found or it
    /// cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let path = base_dirs.config_dir().join("lifeline").join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `LifelineConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(messages) = file.messages {
            if let Some(v) = messages.alert_text {
                config.messages.alert_text = v;
            }
            if let Some(v) = messages.maps_base_url {
                config.messages.maps_base_url = v;
            }
            if let Some(v) = messages.fallback_name {
                config.messages.fallback_name = v;
            }
        }
        if let Some(fanout) = file.fanout
            && let Some(max) = fanout.max_concurrent_targets
        {
            config.fanout = config.fanout.with_max_concurrent(max);
        }
        if let Some(location) = file.location {
            if let Some(v) = location.enabled {
                config.location.enabled = v;
            }
            config.location.latitude = location.latitude;
            config.location.longitude = location.longitude;
        }
        if let Some(logging) = file.logging {
            config.logging.format = logging.format;
            config.logging.level = logging.level;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Applies `LIFELINE_*` environment variable overrides.
    ///
    /// | Variable | Overrides |
    /// |----------|-----------|
    /// | `LIFELINE_DATA_DIR` | `data_dir` |
    /// | `LIFELINE_LOCATION_ENABLED` | `location.enabled` |
    /// | `LIFELINE_LATITUDE` / `LIFELINE_LONGITUDE` | default fix |
    /// | `LIFELINE_FANOUT_MAX_CONCURRENT` | `fanout.max_concurrent_targets` |
    /// | `LIFELINE_LOG_FORMAT` | `logging.format` |
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("LIFELINE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("LIFELINE_LOCATION_ENABLED") {
            self.location.enabled = parse_bool(&v).unwrap_or(self.location.enabled);
        }
        if let Some(v) = var("LIFELINE_LATITUDE").and_then(|v| v.trim().parse().ok()) {
            self.location.latitude = Some(v);
        }
        if let Some(v) = var("LIFELINE_LONGITUDE").and_then(|v| v.trim().parse().ok()) {
            self.location.longitude = Some(v);
        }
        if let Some(v) = var("LIFELINE_FANOUT_MAX_CONCURRENT").and_then(|v| v.trim().parse().ok())
        {
            self.fanout = self.fanout.with_max_concurrent(v);
        }
        if let Some(v) = var("LIFELINE_LOG_FORMAT") {
            self.logging.format = Some(v);
        }

        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Returns the `SQLite` database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LifelineConfig::new();
        assert_eq!(config.messages.alert_text, DEFAULT_ALERT_TEXT);
        assert_eq!(config.fanout.max_concurrent_targets, 16);
        assert!(config.location.enabled);
        assert!(config.database_path().ends_with(DATABASE_FILE));
    }

    #[test]
    fn test_parse_full_file() {
        let config = LifelineConfig::parse(
            r#"
            data_dir = "/tmp/lifeline-test"

            [messages]
            fallback_name = "Someone"

            [fanout]
            max_concurrent_targets = 0

            [location]
            enabled = false
            latitude = 31.5
            longitude = 74.3

            [logging]
            format = "json"
            "#,
        )
        .expect("parse");

        assert_eq!(config.data_dir, PathBuf::from("/tmp/lifeline-test"));
        assert_eq!(config.messages.fallback_name, "Someone");
        assert_eq!(config.messages.alert_text, DEFAULT_ALERT_TEXT);
        assert_eq!(config.fanout.max_concurrent_targets, 1);
        assert!(!config.location.enabled);
        assert_eq!(config.location.latitude, Some(31.5));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(matches!(
            LifelineConfig::parse("bogus = 1"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LIFELINE_DATA_DIR", "/data"),
            ("LIFELINE_LOCATION_ENABLED", "no"),
            ("LIFELINE_LATITUDE", "10.25"),
            ("LIFELINE_LONGITUDE", "not-a-number"),
            ("LIFELINE_FANOUT_MAX_CONCURRENT", "3"),
        ]
        .into_iter()
        .collect();

        let config = LifelineConfig::new()
            .with_overrides(|name| vars.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert!(!config.location.enabled);
        assert_eq!(config.location.latitude, Some(10.25));
        assert_eq!(config.location.longitude, None);
        assert_eq!(config.fanout.max_concurrent_targets, 3);
    }
}
