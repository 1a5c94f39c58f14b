//! Configuration management
//!
//! TOML file plus environment overrides. Environment variables win over the
//! file; the file wins over defaults. Role names and other domain enums are
//! fixed and deliberately not configurable.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; created on first open
    pub path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// How long a writer waits for the database lock before giving up
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("agora.db"),
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level name (trace, debug, info, warn, error)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(format!("{}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Environment overrides:
    /// `AGORA_DB_PATH`, `AGORA_DB_MAX_CONNECTIONS`, `AGORA_LOG_LEVEL`,
    /// `AGORA_LOG_JSON`
    fn apply_env(&mut self) {
        if let Ok(path) = env::var("AGORA_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(max) = env::var("AGORA_DB_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse() {
                self.database.max_connections = max;
            }
        }
        if let Ok(level) = env::var("AGORA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("AGORA_LOG_JSON") {
            self.logging.json_format = json == "1" || json.eq_ignore_ascii_case("true");
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.database.busy_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "database.busy_timeout must be non-zero".to_string(),
            ));
        }
        if crate::logging::LogLevel::from_str(&self.logging.level).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "logging.level '{}' is not a known level",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "/tmp/community.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/community.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_busy_timeout_parses_humantime() {
        let config: Config = toml::from_str(
            r#"
            [database]
            busy_timeout = "250ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
