//! Helpers shared by the server integration tests.

#![allow(dead_code)]

use dispatch_common::config::DispatchMode;
use dispatch_common::consts::{ORIGIN_LAT, ORIGIN_LON};
use dispatch_common::protocol::{RideRequestPayload, RideType};
use dispatch_server::{Coordinator, DispatchClient, RideReply, ServerConfig, WorkerMode};
use dispatch_shared_memory::Driver;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

/// Thread-mode config on an ephemeral loopback port with everything on
/// disk inside `dir`.
pub fn test_config(dir: &TempDir, workers: usize, mode: DispatchMode) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listen.host = "127.0.0.1".to_string();
    config.listen.port = 0;
    config.workers.count = workers;
    config.workers.mode = WorkerMode::Thread;
    config.fleet.driver_count = 0;
    config.fleet.dispatch_mode = mode;
    config.persistence.shm_dir = dir.path().to_path_buf();
    config.persistence.snapshot_path = dir.path().join("server.dat");
    config
}

/// Start a server and replace its roster with `drivers`.
pub fn start_with_drivers(
    dir: &TempDir,
    workers: usize,
    mode: DispatchMode,
    drivers: &[Driver],
) -> Coordinator {
    let coordinator = Coordinator::start(test_config(dir, workers, mode)).unwrap();
    {
        let mut state = coordinator.store().lock().unwrap();
        state.driver_count = 0;
        for driver in drivers {
            state.add_driver(*driver).unwrap();
        }
    }
    coordinator
}

/// Available driver `offset` degrees north of the origin.
pub fn driver(id: u32, offset: f64, rating: f64) -> Driver {
    Driver {
        lat: ORIGIN_LAT + offset,
        lon: ORIGIN_LON,
        rating,
        ..Driver::joined(id)
    }
}

pub fn ride(client_id: u32) -> RideRequestPayload {
    RideRequestPayload::new(client_id, RideType::Normal, ORIGIN_LAT, ORIGIN_LON)
}

/// Handshake and one ride request on a fresh connection.
pub fn request_ride(coordinator: &Coordinator, client_id: u32) -> RideReply {
    let mut client = DispatchClient::connect(coordinator.local_addr()).unwrap();
    client.handshake().unwrap();
    client.request_ride(&ride(client_id)).unwrap()
}

/// Sleep until just after the next whole second, so a short burst of
/// requests lands within one rate-limit window.
pub fn align_to_second_start() {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    let remaining = Duration::from_secs(1) - Duration::from_nanos(u64::from(now.subsec_nanos()));
    std::thread::sleep(remaining + Duration::from_millis(5));
}
