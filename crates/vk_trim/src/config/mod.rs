//! Configuration system
//!
//! File-backed settings share the [`Config`] trait; the trim settings live in
//! [`TrimConfig`] and can also be read from the environment of the traced
//! process.

mod trim_config;

pub use serde::{Deserialize, Serialize};
pub use trim_config::{
    TrimConfig, ENV_MAX_COMMAND_BATCHED_SIZE, ENV_ORDERED_IMAGES, ENV_TRIGGER,
};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Trigger string that matches neither the frame nor the hot-key form
    #[error("Invalid trim trigger '{value}': {reason}")]
    InvalidTrigger {
        /// The rejected trigger string
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A setting holds a value outside its accepted range
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Name of the setting
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },
}
