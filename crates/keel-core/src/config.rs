//! Chassis configuration.
//!
//! Configuration is applied in layers, with later layers overriding earlier
//! ones: built-in defaults, then an optional TOML file, then environment
//! variables under the `KEEL` prefix.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying io failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The final configuration failed validation.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level chassis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChassisConfig {
    /// Name the service identifies itself by in logs and records.
    pub application_name: String,
    /// Deployment environment label.
    pub environment: String,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Body capture settings.
    pub capture: CaptureConfig,
    /// Lookup cache and change feed settings.
    pub cache: CacheConfig,
    /// Names of the backing collections.
    pub collections: CollectionNames,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            application_name: "keel-service".to_string(),
            environment: "development".to_string(),
            logging: LoggingConfig::default(),
            capture: CaptureConfig::default(),
            cache: CacheConfig::default(),
            collections: CollectionNames::default(),
        }
    }
}

/// Names of the backing collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionNames {
    /// Collection the message cache loads from and watches.
    pub messages: String,
    /// Collection the parameter cache loads from and watches.
    pub params: String,
    /// Collection traceability checkpoints are written to.
    pub traceability: String,
    /// Collection service error records are written to.
    pub service_errors: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            messages: "messages".to_string(),
            params: "params".to_string(),
            traceability: "traceability".to_string(),
            service_errors: "service_errors".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter, in `tracing_subscriber::EnvFilter` syntax.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Whether spans and events include source locations.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable output for development.
    Pretty,
}

/// Body capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Maximum number of payload bytes retained per direction.
    pub max_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_bytes: 64 * 1024,
        }
    }
}

/// Lookup cache and change feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Initial delay before resubscribing to a dropped change feed, in
    /// milliseconds.
    pub resubscribe_initial_millis: u64,
    /// Upper bound on the resubscription delay, in milliseconds.
    pub resubscribe_max_millis: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resubscribe_initial_millis: 500,
            resubscribe_max_millis: 30_000,
        }
    }
}

impl ChassisConfig {
    /// Loads configuration from defaults, an optional file, and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or
    /// parsed, or if the final configuration fails validation.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// or is not valid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies `KEEL__SECTION__KEY` environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(name) = env::var("KEEL__APPLICATION_NAME") {
            self.application_name = name;
        }
        if let Ok(environment) = env::var("KEEL__ENVIRONMENT") {
            self.environment = environment;
        }
        if let Ok(level) = env::var("KEEL__LOGGING__LEVEL") {
            self.logging.level = level;
        }
        if let Ok(raw) = env::var("KEEL__CAPTURE__MAX_BYTES") {
            if let Ok(max_bytes) = raw.parse() {
                self.capture.max_bytes = max_bytes;
            }
        }
    }

    /// Validates the final configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Validation(
                "application_name must not be empty".to_string(),
            ));
        }
        if self.capture.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "capture.max_bytes must be positive".to_string(),
            ));
        }
        if [
            &self.collections.messages,
            &self.collections.params,
            &self.collections.traceability,
            &self.collections.service_errors,
        ]
        .iter()
        .any(|name| name.is_empty())
        {
            return Err(ConfigError::Validation(
                "collection names must not be empty".to_string(),
            ));
        }
        if self.cache.resubscribe_initial_millis > self.cache.resubscribe_max_millis {
            return Err(ConfigError::Validation(
                "cache.resubscribe_initial_millis must not exceed resubscribe_max_millis"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ChassisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.capture.max_bytes, 64 * 1024);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: ChassisConfig = toml::from_str(
            r#"
            application_name = "rates-service"

            [logging]
            level = "debug"
            format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.application_name, "rates-service");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_collection_names_default_and_override() {
        let config = ChassisConfig::default();
        assert_eq!(config.collections.messages, "messages");
        assert_eq!(config.collections.service_errors, "service_errors");

        let config: ChassisConfig = toml::from_str(
            r#"
            [collections]
            messages = "app_messages"
            "#,
        )
        .unwrap();
        assert_eq!(config.collections.messages, "app_messages");
        assert_eq!(config.collections.params, "params");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<ChassisConfig, _> = toml::from_str("unknown_key = true");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_application_name_rejected() {
        let config = ChassisConfig {
            application_name: String::new(),
            ..ChassisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_bounds_validated() {
        let mut config = ChassisConfig::default();
        config.cache.resubscribe_initial_millis = 60_000;
        assert!(config.validate().is_err());
    }
}
