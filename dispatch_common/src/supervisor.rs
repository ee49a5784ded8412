//! # Worker Supervisor Trait
//!
//! Defines the supervisor contract for the dispatch worker pool.
//! The server coordinator implements this trait to spawn, monitor, restart
//! and shut down its workers, whether they are forked processes or threads.

use std::fmt;

/// Index of a worker slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Health status returned by [`WorkerSupervisor::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerHealth {
    /// Worker is alive and accepting connections.
    Running,
    /// Worker has exited.
    Exited {
        /// Exit code if available.
        exit_code: Option<i32>,
    },
    /// Slot was never started or is no longer tracked.
    Unknown,
}

/// Error type for supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Failed to start the requested worker.
    #[error("failed to spawn {worker}: {reason}")]
    SpawnFailed {
        /// Slot that failed
        worker: WorkerId,
        /// OS-level reason
        reason: String,
    },

    /// Slot index outside the pool.
    #[error("{0} is not part of the pool")]
    UnknownWorker(WorkerId),

    /// Restart budget exhausted.
    #[error("max restarts ({max}) exhausted, {worker} stays down")]
    RestartsExhausted {
        /// Slot that could not be restarted
        worker: WorkerId,
        /// Configured restart budget
        max: u32,
    },

    /// Generic OS error during stop or reap.
    #[error("supervisor error: {0}")]
    Other(String),
}

/// Supervisor contract for the worker pool.
///
/// # Example
///
/// ```rust,ignore
/// struct Pool { /* ... */ }
///
/// impl WorkerSupervisor for Pool {
///     fn spawn_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError> { /* ... */ }
///     fn health_check(&mut self, worker: WorkerId) -> WorkerHealth { /* ... */ }
///     fn restart_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError> { /* ... */ }
///     fn shutdown_all(&mut self) -> Result<(), SupervisorError> { /* ... */ }
/// }
/// ```
pub trait WorkerSupervisor {
    /// Start the worker in the given slot.
    fn spawn_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError>;

    /// Query a worker's health.
    ///
    /// Takes `&mut self` because reaping an exited child updates bookkeeping.
    fn health_check(&mut self, worker: WorkerId) -> WorkerHealth;

    /// Replace a worker that has exited.
    ///
    /// Fails with [`SupervisorError::RestartsExhausted`] once the restart
    /// budget is spent.
    fn restart_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError>;

    /// Stop every worker and wait for all of them to exit.
    fn shutdown_all(&mut self) -> Result<(), SupervisorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_id_display() {
        assert_eq!(WorkerId(7).to_string(), "worker-7");
    }

    #[test]
    fn test_error_messages() {
        let err = SupervisorError::RestartsExhausted {
            worker: WorkerId(3),
            max: 5,
        };
        assert_eq!(
            err.to_string(),
            "max restarts (5) exhausted, worker-3 stays down"
        );
    }
}
