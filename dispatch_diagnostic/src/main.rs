//! # Ride Dispatch Diagnostic Dump
//!
//! Reads a shutdown snapshot without touching any running server and
//! prints totals, the first drivers, a status summary and the surge quote
//! the fleet would currently get.
//!
//! ```bash
//! dispatch_diagnostic --snapshot server.dat --limit 10
//! dispatch_diagnostic --json
//! ```

mod report;

use clap::Parser;
use dispatch_common::consts::DEFAULT_SNAPSHOT_FILE;
use dispatch_shared_memory::load_snapshot;
use report::SnapshotReport;
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Ride dispatch snapshot dump
#[derive(Parser, Debug)]
#[command(name = "dispatch_diagnostic")]
#[command(version)]
#[command(about = "Print a summary of a ride dispatch snapshot")]
struct Args {
    /// Snapshot file written by the server on shutdown
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    snapshot: PathBuf,

    /// Number of drivers to list
    #[arg(short, long, default_value_t = 5)]
    limit: usize,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        eprintln!("dispatch_diagnostic: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    debug!("Loading {}", args.snapshot.display());
    let state = load_snapshot(&args.snapshot)?
        .ok_or_else(|| format!("no snapshot at {}", args.snapshot.display()))?;

    let report = SnapshotReport::build(&state, args.limit);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
