//! Driver configuration.
//!
//! Read once when the driver is built and never reloaded. Applications that
//! keep their settings in a JSON file put them under a `mongo` section:
//!
//! ```json
//! { "mongo": { "database": "app", "host": "mongodb://localhost:27017", "strict": true } }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Name of the configuration section holding driver settings.
pub const CONFIG_SECTION: &str = "mongo";

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no `{0}` section in configuration")]
    MissingSection(&'static str),

    #[error("`{0}` must not be empty")]
    MissingField(&'static str),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Database name, host URI and strict-mode flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    pub database: String,
    pub host: String,
    /// Treat update/delete calls that affect nothing as errors.
    #[serde(default)]
    pub strict: bool,
}

impl DriverConfig {
    pub fn new(database: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            host: host.into(),
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read the `mongo` section of an application configuration value.
    pub fn from_value(config: &Value) -> Result<Self, ConfigError> {
        let section = config
            .get(CONFIG_SECTION)
            .ok_or(ConfigError::MissingSection(CONFIG_SECTION))?;
        let parsed: Self = serde_json::from_value(section.clone())?;
        parsed.checked()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    fn checked(self) -> Result<Self, ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField("database"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingField("host"));
        }
        Ok(self)
    }
}
