//! INI configuration file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use tracing::{debug, warn};

use super::error::ConfigError;
use crate::impression::{
    EngineConfig, ImpressionItem, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DELAY_TIME_MS,
    DEFAULT_POLL_INTERVAL, DEFAULT_RATIO,
};
use crate::logging::LoggingConfig;

const APP_DIR: &str = "impressionlog";
const FILE_NAME: &str = "config.ini";

const ENGINE: &str = "engine";
const IMPRESSION: &str = "impression";
const LOGGING: &str = "logging";

/// Directory holding the configuration file.
pub fn config_directory() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Default location of the configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    config_directory().map(|dir| dir.join(FILE_NAME))
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub poll_interval_ms: u64,
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// `[impression]` section: thresholds for items created from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpressionDefaults {
    pub delay_ms: u64,
    pub ratio: f32,
}

impl Default for ImpressionDefaults {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_TIME_MS,
            ratio: DEFAULT_RATIO,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub impression: ImpressionDefaults,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path().ok_or(ConfigError::NoConfigDir)?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate INI text. Missing keys keep their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(ENGINE)) {
            for (key, value) in section.iter() {
                match key {
                    "poll_interval_ms" => {
                        config.engine.poll_interval_ms =
                            parse_value(ENGINE, "poll_interval_ms", value)?
                    }
                    "channel_capacity" => {
                        config.engine.channel_capacity =
                            parse_value(ENGINE, "channel_capacity", value)?
                    }
                    other => warn!(section = ENGINE, key = other, "Unknown config key"),
                }
            }
        }

        if let Some(section) = ini.section(Some(IMPRESSION)) {
            for (key, value) in section.iter() {
                match key {
                    "delay_ms" => {
                        config.impression.delay_ms = parse_value(IMPRESSION, "delay_ms", value)?
                    }
                    "ratio" => config.impression.ratio = parse_value(IMPRESSION, "ratio", value)?,
                    other => warn!(section = IMPRESSION, key = other, "Unknown config key"),
                }
            }
        }

        if let Some(section) = ini.section(Some(LOGGING)) {
            for (key, value) in section.iter() {
                match key {
                    "level" => config.logging.level = value.trim().to_string(),
                    "file" => {
                        let value = value.trim();
                        config.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
                    }
                    other => warn!(section = LOGGING, key = other, "Unknown config key"),
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.poll_interval_ms == 0 {
            return Err(invalid(
                ENGINE,
                "poll_interval_ms",
                self.engine.poll_interval_ms,
                "must be greater than 0",
            ));
        }
        if self.engine.channel_capacity == 0 {
            return Err(invalid(
                ENGINE,
                "channel_capacity",
                self.engine.channel_capacity,
                "must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.impression.ratio) {
            return Err(invalid(
                IMPRESSION,
                "ratio",
                self.impression.ratio,
                "must be between 0 and 1",
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(invalid(LOGGING, "level", "", "must not be empty"));
        }
        Ok(())
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(ENGINE))
            .set("poll_interval_ms", self.engine.poll_interval_ms.to_string())
            .set("channel_capacity", self.engine.channel_capacity.to_string());
        ini.with_section(Some(IMPRESSION))
            .set("delay_ms", self.impression.delay_ms.to_string())
            .set("ratio", self.impression.ratio.to_string());
        ini.with_section(Some(LOGGING))
            .set("level", self.logging.level.clone())
            .set(
                "file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            );
        ini
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Write to the default location and return it.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_file_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Engine configuration described by this file.
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_poll_interval(Duration::from_millis(self.engine.poll_interval_ms))
            .with_channel_capacity(self.engine.channel_capacity)
    }

    /// An item for `key` with the configured default thresholds.
    pub fn item<K>(&self, key: K) -> ImpressionItem<K> {
        ImpressionItem::new(key)
            .with_delay_ms(self.impression.delay_ms)
            .with_ratio(self.impression.ratio)
    }
}

fn parse_value<T>(section: &'static str, key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(section, key, raw, e))
}

fn invalid(
    section: &'static str,
    key: &'static str,
    value: impl ToString,
    reason: impl ToString,
) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        let config = ConfigFile::parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.engine.poll_interval_ms, 10);
        assert_eq!(config.impression.delay_ms, 2000);
        assert_eq!(config.impression.ratio, 0.5);
    }

    #[test]
    fn test_parse_all_sections() {
        let config = ConfigFile::parse(
            "[engine]\npoll_interval_ms = 25\nchannel_capacity = 64\n\
             [impression]\ndelay_ms = 500\nratio = 0.75\n\
             [logging]\nlevel = debug\nfile = /tmp/impressions.log\n",
        )
        .unwrap();

        assert_eq!(config.engine.poll_interval_ms, 25);
        assert_eq!(config.engine.channel_capacity, 64);
        assert_eq!(config.impression.delay_ms, 500);
        assert_eq!(config.impression.ratio, 0.75);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/tmp/impressions.log"))
        );

        let engine = config.to_engine_config();
        assert_eq!(engine.poll_interval, Duration::from_millis(25));
        assert_eq!(engine.channel_capacity, 64);
    }

    #[test]
    fn test_rejects_ratio_out_of_range() {
        let err = ConfigFile::parse("[impression]\nratio = 1.5\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "ratio",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let err = ConfigFile::parse("[engine]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "poll_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_numeric() {
        let err = ConfigFile::parse("[engine]\nchannel_capacity = lots\n").unwrap_err();
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = ConfigFile::parse("[engine]\nturbo = yes\n").unwrap();
        assert_eq!(config.engine, EngineSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.engine.poll_interval_ms = 40;
        config.impression.ratio = 0.25;
        config.logging.level = "trace".to_string();

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_item_uses_defaults() {
        let mut config = ConfigFile::default();
        config.impression.delay_ms = 300;
        config.impression.ratio = 0.9;

        let item = config.item("k");
        assert_eq!(item.delay_time_ms, 300);
        assert_eq!(item.ratio, 0.9);
    }
}
