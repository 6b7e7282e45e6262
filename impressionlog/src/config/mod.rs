//! Configuration file support.
//!
//! Settings live in an INI file under the user's configuration directory
//! (`~/.config/impressionlog/config.ini` on Linux). A missing file means
//! defaults; present values are validated on load.
//!
//! ```ini
//! [engine]
//! poll_interval_ms = 10
//! channel_capacity = 1024
//!
//! [impression]
//! delay_ms = 2000
//! ratio = 0.5
//!
//! [logging]
//! level = info
//! file = /tmp/impressionlog.log
//! ```

mod error;
mod file;
mod keys;

pub use error::ConfigError;
pub use file::{config_directory, config_file_path, ConfigFile, EngineSettings, ImpressionDefaults};
pub use keys::{ConfigKey, UnknownConfigKey};
