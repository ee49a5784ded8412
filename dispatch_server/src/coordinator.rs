//! Coordinator: owns the shared state store, the listening socket and the
//! worker pool.
//!
//! Startup order is orphan cleanup, store creation, state initialization,
//! bind, then workers. Shutdown stops every worker before the final
//! snapshot is written, so the snapshot sees no half-finished request.

use crate::config::{ServerConfig, WorkerMode};
use crate::error::ServerError;
use crate::worker::{ShutdownToken, run_worker};
use dispatch_common::supervisor::{SupervisorError, WorkerHealth, WorkerId, WorkerSupervisor};
use dispatch_shared_memory::{
    InitSource, SharedStateStore, cleanup_orphaned_segments, initialize_state, persist_state,
};
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, kill, signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the pool is polled for exited workers.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(200);

const WAKE_TIMEOUT: Duration = Duration::from_millis(200);

enum WorkerSlot {
    Idle,
    Process(Pid),
    Thread(JoinHandle<()>),
}

/// Running server.
pub struct Coordinator {
    config: ServerConfig,
    store: Arc<SharedStateStore>,
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    shutdown: ShutdownToken,
    workers: Vec<WorkerSlot>,
    restarts_used: u32,
    init_source: InitSource,
}

impl Coordinator {
    /// Bring the server up and spawn every worker.
    ///
    /// # Errors
    ///
    /// Invalid configuration, segment creation failure, bind failure or a
    /// worker that cannot be spawned. Nothing is left running on error.
    pub fn start(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let persistence = &config.persistence;

        match cleanup_orphaned_segments(&persistence.shm_dir, &persistence.segment_name) {
            Ok(0) => {}
            Ok(n) => info!("Removed {} orphaned segment(s)", n),
            Err(e) => warn!(
                "Orphan cleanup in {} failed: {}",
                persistence.shm_dir.display(),
                e
            ),
        }

        let store = SharedStateStore::create(&persistence.shm_dir, &persistence.segment_name)?;
        let init_source = {
            let mut state = store.lock()?;
            initialize_state(
                &mut state,
                &persistence.snapshot_path,
                config.fleet.driver_count,
                config.fleet.dispatch_mode,
                &mut StdRng::from_entropy(),
            )
        };

        let address = config.listen.address();
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!(
            "{} listening on {} ({} {} workers, {} dispatch)",
            config.shared.service_name,
            local_addr,
            config.workers.count,
            match config.workers.mode {
                WorkerMode::Process => "process",
                WorkerMode::Thread => "thread",
            },
            config.fleet.dispatch_mode
        );

        let worker_count = config.workers.count;
        let mut coordinator = Self {
            config,
            store: Arc::new(store),
            listener: Arc::new(listener),
            local_addr,
            shutdown: ShutdownToken::new(),
            workers: (0..worker_count).map(|_| WorkerSlot::Idle).collect(),
            restarts_used: 0,
            init_source,
        };

        for i in 0..worker_count {
            if let Err(e) = coordinator.spawn_worker(WorkerId(i)) {
                let _ = coordinator.shutdown_all();
                return Err(e.into());
            }
        }

        Ok(coordinator)
    }

    /// Bound address, useful when the configured port is `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Token that ends [`Coordinator::run_until_shutdown`] when triggered.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    pub fn store(&self) -> &SharedStateStore {
        &self.store
    }

    pub fn init_source(&self) -> InitSource {
        self.init_source
    }

    pub fn restarts_used(&self) -> u32 {
        self.restarts_used
    }

    /// Number of slots currently holding a worker.
    pub fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|slot| !matches!(slot, WorkerSlot::Idle))
            .count()
    }

    /// Pids of forked workers; empty in thread mode.
    pub fn worker_pids(&self) -> Vec<Pid> {
        self.workers
            .iter()
            .filter_map(|slot| match slot {
                WorkerSlot::Process(pid) => Some(*pid),
                _ => None,
            })
            .collect()
    }

    /// Supervise the pool until the shutdown token fires, then shut down.
    pub fn run_until_shutdown(mut self) -> Result<(), ServerError> {
        while !self.shutdown.is_triggered() {
            std::thread::sleep(HEALTH_POLL_INTERVAL);
            self.supervise_once();
        }
        self.shutdown()
    }

    /// One health pass: reap exited workers and restart them while the
    /// restart budget lasts.
    pub fn supervise_once(&mut self) {
        for i in 0..self.workers.len() {
            if self.shutdown.is_triggered() {
                return;
            }
            let id = WorkerId(i);
            if let WorkerHealth::Exited { exit_code } = self.health_check(id) {
                warn!("{} exited (code {:?})", id, exit_code);
                if let Err(e) = self.restart_worker(id) {
                    error!("{}", e);
                }
            }
        }
    }

    /// Stop every worker, then write the snapshot. The segment file is
    /// removed when the coordinator is dropped.
    pub fn shutdown(mut self) -> Result<(), ServerError> {
        info!("Shutting down");
        self.shutdown_all()?;

        let state = self.store.lock()?;
        persist_state(&state, &self.config.persistence.snapshot_path)?;
        Ok(())
    }

    fn spawn_process(&self, id: WorkerId) -> Result<Pid, SupervisorError> {
        // SAFETY: the child only runs the accept loop and leaves through
        // `process::exit`. In process mode the parent runs no worker
        // threads; what remains is the signal relay, idle in its wait, and
        // any thread the embedding program started. A lock such a thread
        // holds at fork time (the `tracing` subscriber's writer, the
        // allocator's) stays held in the child, which logs and allocates.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => Ok(child),
            Ok(ForkResult::Child) => {
                reset_child_signals();
                run_worker(id, &self.listener, &self.store, &ShutdownToken::new());
                std::process::exit(0);
            }
            Err(e) => Err(SupervisorError::SpawnFailed {
                worker: id,
                reason: e.to_string(),
            }),
        }
    }

    fn spawn_thread(&self, id: WorkerId) -> Result<JoinHandle<()>, SupervisorError> {
        let listener = Arc::clone(&self.listener);
        let store = Arc::clone(&self.store);
        let shutdown = self.shutdown.clone();

        std::thread::Builder::new()
            .name(id.to_string())
            .spawn(move || run_worker(id, &listener, &store, &shutdown))
            .map_err(|e| SupervisorError::SpawnFailed {
                worker: id,
                reason: e.to_string(),
            })
    }

    fn slot(&self, id: WorkerId) -> Result<&WorkerSlot, SupervisorError> {
        self.workers.get(id.0).ok_or(SupervisorError::UnknownWorker(id))
    }

    /// Loopback address that reaches the listener even when it is bound
    /// to the unspecified address.
    fn wake_addr(&self) -> SocketAddr {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.local_addr.port())
    }
}

impl WorkerSupervisor for Coordinator {
    fn spawn_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError> {
        if !matches!(self.slot(worker)?, WorkerSlot::Idle) {
            return Err(SupervisorError::Other(format!("{worker} is already running")));
        }

        let slot = match self.config.workers.mode {
            WorkerMode::Process => WorkerSlot::Process(self.spawn_process(worker)?),
            WorkerMode::Thread => WorkerSlot::Thread(self.spawn_thread(worker)?),
        };
        debug!("Spawned {}", worker);
        self.workers[worker.0] = slot;
        Ok(())
    }

    fn health_check(&mut self, worker: WorkerId) -> WorkerHealth {
        let Some(slot) = self.workers.get_mut(worker.0) else {
            return WorkerHealth::Unknown;
        };

        match slot {
            WorkerSlot::Idle => WorkerHealth::Unknown,
            WorkerSlot::Process(pid) => match waitpid(*pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => WorkerHealth::Running,
                Ok(WaitStatus::Exited(_, code)) => {
                    *slot = WorkerSlot::Idle;
                    WorkerHealth::Exited {
                        exit_code: Some(code),
                    }
                }
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    debug!("{} killed by {}", worker, sig);
                    *slot = WorkerSlot::Idle;
                    WorkerHealth::Exited { exit_code: None }
                }
                Ok(_) => WorkerHealth::Running,
                Err(Errno::ECHILD) => {
                    *slot = WorkerSlot::Idle;
                    WorkerHealth::Exited { exit_code: None }
                }
                Err(e) => {
                    warn!("waitpid for {} failed: {}", worker, e);
                    WorkerHealth::Unknown
                }
            },
            WorkerSlot::Thread(handle) => {
                if !handle.is_finished() {
                    return WorkerHealth::Running;
                }
                let WorkerSlot::Thread(handle) = std::mem::replace(slot, WorkerSlot::Idle) else {
                    return WorkerHealth::Unknown;
                };
                let exit_code = handle.join().ok().map(|()| 0);
                WorkerHealth::Exited { exit_code }
            }
        }
    }

    fn restart_worker(&mut self, worker: WorkerId) -> Result<(), SupervisorError> {
        let max = self.config.workers.max_restarts;
        if self.restarts_used >= max {
            return Err(SupervisorError::RestartsExhausted { worker, max });
        }
        self.restarts_used += 1;
        warn!(
            "Restarting {} ({}/{} restarts used)",
            worker, self.restarts_used, max
        );
        self.spawn_worker(worker)
    }

    fn shutdown_all(&mut self) -> Result<(), SupervisorError> {
        self.shutdown.trigger();

        let mut threads = Vec::new();
        let mut processes = Vec::new();
        for slot in &mut self.workers {
            match std::mem::replace(slot, WorkerSlot::Idle) {
                WorkerSlot::Idle => {}
                WorkerSlot::Process(pid) => processes.push(pid),
                WorkerSlot::Thread(handle) => threads.push(handle),
            }
        }

        for &pid in &processes {
            match kill(pid, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to signal worker {}: {}", pid, e),
            }
        }
        for pid in processes {
            match waitpid(pid, None) {
                Ok(_) | Err(Errno::ECHILD) => {}
                Err(e) => return Err(SupervisorError::Other(format!("waitpid {pid}: {e}"))),
            }
        }

        // Threads blocked in accept() only see the token after one more
        // connection.
        let wake = self.wake_addr();
        for _ in &threads {
            if let Err(e) = TcpStream::connect_timeout(&wake, WAKE_TIMEOUT) {
                debug!("Wake connection to {} failed: {}", wake, e);
            }
        }
        for handle in threads {
            if handle.join().is_err() {
                warn!("A worker thread panicked");
            }
        }

        info!("All workers stopped");
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.live_workers() > 0 {
            let _ = self.shutdown_all();
        }
    }
}

/// Workers die on SIGTERM and leave SIGINT to the coordinator.
fn reset_child_signals() {
    // SAFETY: only default and ignore dispositions are installed.
    unsafe {
        let _ = signal(Signal::SIGTERM, SigHandler::SigDfl);
        let _ = signal(Signal::SIGINT, SigHandler::SigIgn);
    }
}
