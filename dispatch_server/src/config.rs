//! Server configuration.
//!
//! Loaded from TOML through [`ConfigLoader`]; every section except
//! `[shared]` has defaults, and CLI flags are applied on top afterwards.
//!
//! ```toml
//! [shared]
//! service_name = "dispatch"
//!
//! [listen]
//! port = 9000
//!
//! [workers]
//! count = 100
//! mode = "process"
//!
//! [fleet]
//! driver_count = 10
//! dispatch_mode = "smart"
//!
//! [persistence]
//! snapshot_path = "server.dat"
//! ```

use dispatch_common::config::{ConfigError, DispatchMode, SharedConfig};
use dispatch_common::consts::{
    DEFAULT_DRIVER_COUNT, DEFAULT_PORT, DEFAULT_SEGMENT_NAME, DEFAULT_SHM_DIR,
    DEFAULT_SNAPSHOT_FILE, DEFAULT_WORKER_COUNT,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Service name used when no configuration file is given.
pub const DEFAULT_SERVICE_NAME: &str = "dispatch_server";

/// Default restart budget for the worker pool.
pub const DEFAULT_MAX_RESTARTS: u32 = 5;

/// How workers are realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    /// Forked child processes.
    #[default]
    Process,
    /// Threads of the coordinator process.
    Thread,
}

/// `[listen]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    /// `0` binds an ephemeral port.
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ListenConfig {
    /// `host:port` string for binding.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[workers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
    pub mode: WorkerMode,
    /// Total restarts the coordinator may spend over its lifetime.
    pub max_restarts: u32,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_WORKER_COUNT,
            mode: WorkerMode::default(),
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }
}

/// `[fleet]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Size of a fresh roster, clamped to the driver table capacity.
    pub driver_count: usize,
    pub dispatch_mode: DispatchMode,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            driver_count: DEFAULT_DRIVER_COUNT,
            dispatch_mode: DispatchMode::default(),
        }
    }
}

/// `[persistence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub snapshot_path: PathBuf,
    pub shm_dir: PathBuf,
    pub segment_name: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            shm_dir: PathBuf::from(DEFAULT_SHM_DIR),
            segment_name: DEFAULT_SEGMENT_NAME.to_string(),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::new(DEFAULT_SERVICE_NAME),
            listen: ListenConfig::default(),
            workers: WorkersConfig::default(),
            fleet: FleetConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `ConfigError::ValidationError` for an empty service name, zero
    /// workers or an empty segment name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.workers.count == 0 {
            return Err(ConfigError::ValidationError(
                "workers.count must be at least 1".to_string(),
            ));
        }
        if self.persistence.segment_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "persistence.segment_name cannot be empty".to_string(),
            ));
        }
        if self.listen.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "listen.host cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
