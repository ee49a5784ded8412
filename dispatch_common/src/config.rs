//! Configuration loading traits and types.
//!
//! Every dispatch binary reads its settings from a TOML file through the
//! [`ConfigLoader`] trait and embeds [`SharedConfig`] for the fields all
//! services have in common.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dispatch_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct DumpConfig {
//!     shared: SharedConfig,
//!     limit: usize,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = DumpConfig::load(Path::new("dump.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Matching strategy used by the dispatch path.
///
/// Stored in the shared state as a raw `u32` (`0` = basic, anything else
/// = smart) so external collaborators can read it without this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Nearest eligible driver.
    Basic,
    /// VIP requests prefer highly rated drivers, then fall back to basic.
    #[default]
    Smart,
}

impl DispatchMode {
    /// Raw value stored in shared memory.
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Basic => 0,
            Self::Smart => 1,
        }
    }

    /// Decode the raw shared-memory value.
    pub const fn from_raw(raw: u32) -> Self {
        if raw == 0 { Self::Basic } else { Self::Smart }
    }

    /// Upper-case label used in ride confirmations.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "BASIC",
            Self::Smart => "SMART",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Common configuration fields shared across all dispatch applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "dispatch-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Create a config with the default log level.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: service_name.into(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if the file cannot be read or the
///   TOML is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        level: LogLevel,
        #[serde(default)]
        mode: DispatchMode,
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        for (text, expected) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let parsed: Wrapper = toml::from_str(&format!("level = \"{text}\"")).unwrap();
            assert_eq!(parsed.level, expected);
            assert_eq!(expected.as_directive(), text);
        }
    }

    #[test]
    fn test_dispatch_mode_raw_mapping() {
        assert_eq!(DispatchMode::from_raw(0), DispatchMode::Basic);
        assert_eq!(DispatchMode::from_raw(1), DispatchMode::Smart);
        // Any non-zero flag selects smart dispatch.
        assert_eq!(DispatchMode::from_raw(7), DispatchMode::Smart);
        assert_eq!(DispatchMode::Basic.as_raw(), 0);
        assert_eq!(DispatchMode::Smart.as_raw(), 1);
    }

    #[test]
    fn test_dispatch_mode_deserialization() {
        let parsed: Wrapper = toml::from_str("level = \"info\"\nmode = \"basic\"").unwrap();
        assert_eq!(parsed.mode, DispatchMode::Basic);

        let parsed: Wrapper = toml::from_str("level = \"info\"").unwrap();
        assert_eq!(parsed.mode, DispatchMode::Smart);
    }

    #[test]
    fn test_shared_config_validation() {
        assert!(SharedConfig::new("dispatch").validate().is_ok());
        assert!(matches!(
            SharedConfig::new("").validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = SharedConfig::load(Path::new("/nonexistent/path/server.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = SharedConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_loader_success() {
        #[derive(Debug, Deserialize)]
        struct TestConfig {
            shared: SharedConfig,
            port: u16,
        }

        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"port = 9000

[shared]
log_level = "debug"
service_name = "dispatch-test"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.shared.service_name, "dispatch-test");
        assert_eq!(config.port, 9000);
    }
}
