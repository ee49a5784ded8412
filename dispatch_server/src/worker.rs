//! Worker accept loop.
//!
//! Every worker blocks in `accept()` on the same listening socket and
//! serves one connection at a time. Workers share nothing but the listener
//! and the shared state store.

use crate::handler::ConnectionHandler;
use dispatch_common::supervisor::WorkerId;
use dispatch_shared_memory::SharedStateStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after an accept failure other than `Interrupted`.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Cooperative stop flag shared by the coordinator and its threads.
///
/// It also tracks the connection each worker is serving, so triggering it
/// unblocks a worker stuck reading from a silent peer.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    triggered: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashMap<WorkerId, TcpStream>>>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and shut down every tracked connection.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);

        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        for (worker, stream) in in_flight.iter() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("{} connection already closed: {}", worker, e);
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Record `stream` as the connection `worker` is serving.
    ///
    /// Returns `false` once the token has fired; the caller must then drop
    /// the connection instead of serving it.
    pub fn track(&self, worker: WorkerId, stream: &TcpStream) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock: `trigger` sets the flag before taking it.
        if self.is_triggered() {
            return false;
        }
        match stream.try_clone() {
            Ok(handle) => {
                in_flight.insert(worker, handle);
            }
            Err(e) => warn!("{} cannot track connection: {}", worker, e),
        }
        true
    }

    /// Forget the connection `worker` was serving.
    pub fn untrack(&self, worker: WorkerId) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&worker);
    }
}

/// Accept and serve connections until `shutdown` is triggered.
///
/// The token is checked after every accept, so a thread blocked in
/// `accept()` needs one more incoming connection to notice it. A thread
/// blocked reading from a client is released by the token itself.
pub fn run_worker(
    id: WorkerId,
    listener: &TcpListener,
    store: &SharedStateStore,
    shutdown: &ShutdownToken,
) {
    let mut rng = StdRng::from_entropy();
    info!("{} accepting connections", id);

    while !shutdown.is_triggered() {
        let (mut stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("{} accept failed: {}", id, e);
                std::thread::sleep(ACCEPT_BACKOFF);
                continue;
            }
        };

        if !shutdown.track(id, &stream) {
            break;
        }

        let peer = peer.to_string();
        ConnectionHandler::new(store, &mut rng).serve(&mut stream, &peer);
        shutdown.untrack(id);
    }

    debug!("{} stopped", id);
}
