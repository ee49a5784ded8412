//! # Dispatch Shared State Store
//!
//! The single in-memory record of drivers, pending rides, aggregate
//! counters and per-client rate-limit bookkeeping, shared by every worker of
//! the dispatch server.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────────┐    ┌─────────────────┐
//! │  Coordinator    │    │  <shm_dir>/<name>_<pid>  │    │   Worker N      │
//! │                 │    │                          │    │                 │
//! │ SharedStateStore├───►│ [ProcessMutex|SharedState├◄───┤ StateGuard      │
//! │   ::create      │    │  ]  (MAP_SHARED)         │    │  (lock held)    │
//! └────────┬────────┘    └──────────────────────────┘    └─────────────────┘
//!          │ startup: snapshot::load / seed_roster
//!          │ shutdown: snapshot::save (atomic rename)
//!          ▼
//!      server.dat
//! ```
//!
//! Every read and write of the state happens through a [`StateGuard`],
//! which holds the process-shared robust mutex for its lifetime.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dispatch_shared_memory::{Driver, SharedStateStore};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SharedStateStore::create(Path::new("/dev/shm"), "ride_dispatch")?;
//! {
//!     let mut state = store.lock()?;
//!     state.add_driver(Driver::joined(2001))?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod platform;
pub mod snapshot;
pub mod state;
pub mod store;

pub use error::{ShmError, ShmResult};
pub use lifecycle::{InitSource, cleanup_orphaned_segments, initialize_state, persist_state};
pub use snapshot::{SNAPSHOT_SIZE, decode_snapshot, encode_snapshot, load_snapshot, save_snapshot};
pub use state::{Driver, DriverStatus, PendingRide, SharedState};
pub use store::{SEGMENT_SIZE, SharedStateStore, StateGuard, segment_path};

/// Initialize tracing for tests and small tools
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
