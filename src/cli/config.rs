//! Configuration file parsing.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::memory::DEFAULT_NAMESPACE;

/// Configuration loaded from a TOML file. Every field has a default, so an
/// empty file is valid.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Store location and namespace.
    pub store: StoreConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Where the store lives and which namespace to open.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory of the persistent store.
    pub path: PathBuf,
    /// Namespace opened by `init`.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".nvs-kv"),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"nvs_kv=debug"`.
    pub level: String,
    pub format: LogFormat,
    /// `"stdout"`, `"stderr"`, or a file path to append to.
    pub output: String,
    /// ANSI colors, only applied when the output is a terminal.
    pub color: bool,
    pub timestamps: bool,
    /// Include the event target (module path).
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            output: "stderr".to_string(),
            color: true,
            timestamps: true,
            target: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[store]
path = "/var/lib/nvs-kv"
namespace = "settings"

[logging]
level = "nvs_kv=debug"
format = "json"
output = "stdout"
timestamps = false
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.store.path, PathBuf::from("/var/lib/nvs-kv"));
        assert_eq!(config.store.namespace, "settings");
        assert_eq!(config.logging.level, "nvs_kv=debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, "stdout");
        assert!(!config.logging.timestamps);
        // Unset fields keep their defaults
        assert!(config.logging.color);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.store.namespace, "app_memory");
        assert_eq!(config.logging.output, "stderr");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Config::from_toml("[store]\nsize = 4096\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
