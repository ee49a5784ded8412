//! Startup initialization, shutdown persistence and orphan cleanup

use crate::error::ShmResult;
use crate::platform::is_process_alive;
use crate::snapshot::{load_snapshot, save_snapshot};
use crate::state::SharedState;
use dispatch_common::config::DispatchMode;
use rand::Rng;
use std::path::Path;
use tracing::{info, warn};

/// Where the initial state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSource {
    /// Synthetic roster.
    Fresh,
    /// Previous snapshot.
    Restored,
}

/// Populate `state` from the snapshot at `snapshot_path`, or with a fresh
/// roster of `driver_count` drivers when there is none or it is corrupt.
///
/// The configured `mode` always wins over the snapshot's.
pub fn initialize_state<R: Rng + ?Sized>(
    state: &mut SharedState,
    snapshot_path: &Path,
    driver_count: usize,
    mode: DispatchMode,
    rng: &mut R,
) -> InitSource {
    let source = match load_snapshot(snapshot_path) {
        Ok(Some(restored)) => {
            *state = *restored;
            state.normalize_after_restore();
            info!(
                "Restored state from {}: {} drivers, {} requests, revenue {}",
                snapshot_path.display(),
                state.driver_count(),
                state.total_requests_handled,
                state.total_revenue
            );
            InitSource::Restored
        }
        Ok(None) => {
            state.seed_roster(driver_count, rng);
            info!("No snapshot found, seeded {} drivers", state.driver_count());
            InitSource::Fresh
        }
        Err(e) => {
            warn!(
                "Ignoring snapshot {}: {}; starting fresh",
                snapshot_path.display(),
                e
            );
            state.seed_roster(driver_count, rng);
            InitSource::Fresh
        }
    };

    state.set_dispatch_mode(mode);
    source
}

/// Write the shutdown snapshot.
pub fn persist_state(state: &SharedState, snapshot_path: &Path) -> ShmResult<()> {
    save_snapshot(snapshot_path, state)?;
    info!(
        "Saved state to {}: {} drivers, {} requests, revenue {}",
        snapshot_path.display(),
        state.driver_count(),
        state.total_requests_handled,
        state.total_revenue
    );
    Ok(())
}

/// Remove `<name>_<pid>` segment files in `dir` whose owner is dead.
///
/// Returns the number of files removed.
pub fn cleanup_orphaned_segments(dir: &Path, name: &str) -> ShmResult<usize> {
    let prefix = format!("{name}_");
    let mut cleaned_count = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(pid) = file_name
            .to_str()
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|pid| pid.parse::<u32>().ok())
        else {
            continue;
        };

        if is_process_alive(pid) {
            continue;
        }

        info!("Cleaning up orphaned segment: {}", entry.path().display());
        match std::fs::remove_file(entry.path()) {
            Ok(()) => cleaned_count += 1,
            Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }

    Ok(cleaned_count)
}
