//! Addressing individual settings as `section.key`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ConfigError;
use super::file::ConfigFile;

/// A single configurable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    EnginePollIntervalMs,
    EngineChannelCapacity,
    ImpressionDelayMs,
    ImpressionRatio,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    /// Every key, in file order.
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::EnginePollIntervalMs,
        ConfigKey::EngineChannelCapacity,
        ConfigKey::ImpressionDelayMs,
        ConfigKey::ImpressionRatio,
        ConfigKey::LoggingLevel,
        ConfigKey::LoggingFile,
    ];

    /// `section.key` form.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::EnginePollIntervalMs => "engine.poll_interval_ms",
            ConfigKey::EngineChannelCapacity => "engine.channel_capacity",
            ConfigKey::ImpressionDelayMs => "impression.delay_ms",
            ConfigKey::ImpressionRatio => "impression.ratio",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// Current value rendered as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::EnginePollIntervalMs => config.engine.poll_interval_ms.to_string(),
            ConfigKey::EngineChannelCapacity => config.engine.channel_capacity.to_string(),
            ConfigKey::ImpressionDelayMs => config.impression.delay_ms.to_string(),
            ConfigKey::ImpressionRatio => config.impression.ratio.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse `value` into `config`, rejecting the change if the result is
    /// invalid. `config` is untouched on error.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let mut updated = config.clone();
        let value = value.trim();
        match self {
            ConfigKey::EnginePollIntervalMs => {
                updated.engine.poll_interval_ms = self.parse(value)?;
            }
            ConfigKey::EngineChannelCapacity => {
                updated.engine.channel_capacity = self.parse(value)?;
            }
            ConfigKey::ImpressionDelayMs => {
                updated.impression.delay_ms = self.parse(value)?;
            }
            ConfigKey::ImpressionRatio => {
                updated.impression.ratio = self.parse(value)?;
            }
            ConfigKey::LoggingLevel => {
                updated.logging.level = value.to_string();
            }
            ConfigKey::LoggingFile => {
                updated.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }
        updated.validate()?;
        *config = updated;
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            section: self.section(),
            key: self.key_name(),
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// Section part of the name, e.g. `engine`.
    pub fn section(&self) -> &'static str {
        self.name().split_once('.').map_or("", |(section, _)| section)
    }

    /// Key part of the name, e.g. `poll_interval_ms`.
    pub fn key_name(&self) -> &'static str {
        self.name()
            .split_once('.')
            .map_or(self.name(), |(_, key)| key)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a `section.key` string names no setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConfigKey(pub String);

impl fmt::Display for UnknownConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown configuration key '{}'", self.0)
    }
}

impl std::error::Error for UnknownConfigKey {}

impl FromStr for ConfigKey {
    type Err = UnknownConfigKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| UnknownConfigKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_names() {
        for key in ConfigKey::ALL {
            assert_eq!(key.name().parse::<ConfigKey>(), Ok(key));
        }
        assert_eq!(
            "Impression.Ratio".parse::<ConfigKey>(),
            Ok(ConfigKey::ImpressionRatio)
        );
        assert!("impression.colour".parse::<ConfigKey>().is_err());
    }

    #[test]
    fn test_section_and_key_name() {
        assert_eq!(ConfigKey::EngineChannelCapacity.section(), "engine");
        assert_eq!(ConfigKey::EngineChannelCapacity.key_name(), "channel_capacity");
        assert_eq!(ConfigKey::LoggingFile.section(), "logging");
    }

    #[test]
    fn test_get_and_set() {
        let mut config = ConfigFile::default();
        ConfigKey::ImpressionDelayMs.set(&mut config, "750").unwrap();
        ConfigKey::LoggingFile
            .set(&mut config, "/tmp/log.txt")
            .unwrap();

        assert_eq!(ConfigKey::ImpressionDelayMs.get(&config), "750");
        assert_eq!(ConfigKey::LoggingFile.get(&config), "/tmp/log.txt");

        ConfigKey::LoggingFile.set(&mut config, "").unwrap();
        assert_eq!(ConfigKey::LoggingFile.get(&config), "");
    }

    #[test]
    fn test_invalid_set_leaves_config_untouched() {
        let mut config = ConfigFile::default();

        let err = ConfigKey::ImpressionRatio
            .set(&mut config, "2.0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "ratio", .. }));

        assert!(ConfigKey::EngineChannelCapacity
            .set(&mut config, "many")
            .is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
