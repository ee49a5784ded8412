//! # Ride Dispatch Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Defaults: port 9000, 100 forked workers, 10 drivers, smart dispatch
//! dispatch_server
//!
//! # Basic dispatch with 20 drivers on another port
//! dispatch_server --port 9100 --drivers 20 --mode basic
//!
//! # Config file, thread workers, JSON logs
//! dispatch_server --config server.toml --threads --json
//! ```

use clap::{Parser, ValueEnum};
use dispatch_common::config::{ConfigError, ConfigLoader, DispatchMode};
use dispatch_common::consts::DEFAULT_CONFIG_PATH;
use dispatch_server::{Coordinator, ServerConfig, WorkerMode};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Matching strategy flag.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Basic,
    Smart,
}

impl From<ModeArg> for DispatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Basic => DispatchMode::Basic,
            ModeArg::Smart => DispatchMode::Smart,
        }
    }
}

/// Secure ride dispatch server
#[derive(Parser, Debug)]
#[command(name = "dispatch_server")]
#[command(version)]
#[command(about = "Secure multi-worker ride dispatch server")]
#[command(long_about = None)]
struct Args {
    /// Server configuration file. Without it, the default path is tried
    /// and built-in defaults apply if it does not exist.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listening port
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of drivers in a fresh roster
    #[arg(short, long)]
    drivers: Option<usize>,

    /// Matching strategy
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Number of workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Run workers as threads instead of forked processes
    #[arg(long)]
    threads: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    // Logging depends on the loaded config, so load failures go to stderr.
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dispatch_server: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    setup_tracing(&args, &config);
    if let Err(e) = run(config) {
        error!("Dispatch server failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Ride dispatch server v{} starting...", env!("CARGO_PKG_VERSION"));

    let coordinator = Coordinator::start(config)?;

    let shutdown = coordinator.shutdown_token();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shutdown.trigger();
    })?;

    coordinator.run_until_shutdown()?;

    info!("Ride dispatch server shutdown complete");
    Ok(())
}

/// File (explicit or default path) first, then CLI overrides.
fn load_config(args: &Args) -> Result<ServerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => match ServerConfig::load(Path::new(DEFAULT_CONFIG_PATH)) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound) => ServerConfig::default(),
            Err(e) => return Err(e),
        },
    };

    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(drivers) = args.drivers {
        config.fleet.driver_count = drivers;
    }
    if let Some(mode) = args.mode {
        config.fleet.dispatch_mode = mode.into();
    }
    if let Some(workers) = args.workers {
        config.workers.count = workers;
    }
    if args.threads {
        config.workers.mode = WorkerMode::Thread;
    }

    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber from the configured level and CLI flags.
fn setup_tracing(args: &Args, config: &ServerConfig) {
    let level = if args.verbose {
        "debug"
    } else {
        config.shared.log_level.as_directive()
    };

    let filter = EnvFilter::from_default_env().add_directive(
        level
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    );

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
