//! System-wide constants for the dispatch workspace.
//!
//! Single source of truth for capacities, protocol limits, business
//! thresholds and default paths. Imported by all crates.

/// Fixed capacity of the driver table in the shared state.
pub const MAX_DRIVERS: usize = 256;

/// Fixed capacity of the pending-ride table in the shared state.
pub const MAX_PENDING_RIDES: usize = 128;

/// Size of the per-client rate-limit tables. Ids outside `1..MAX_CLIENTS`
/// are not throttled.
pub const MAX_CLIENTS: usize = 2000;

/// Largest payload a peer may declare in a frame header.
pub const MAX_PAYLOAD_LEN: u32 = 1024;

/// Requests allowed per client within one wall-clock second.
pub const RATE_LIMIT_PER_SECOND: u32 = 3;

/// Client ids up to and including this value are VIP.
pub const VIP_CLIENT_ID_MAX: u32 = 10;

/// Minimum rating for the VIP-restricted driver scan.
pub const VIP_RATING_THRESHOLD: f64 = 4.8;

/// Base fare charged for every confirmed ride.
pub const BASE_FARE: i64 = 100;

/// Surcharge added to the base fare for VIP rides.
pub const VIP_SURCHARGE: i64 = 50;

/// Fixed dispatch origin (latitude) all distances are measured from.
pub const ORIGIN_LAT: f64 = 25.0330;

/// Fixed dispatch origin (longitude) all distances are measured from.
pub const ORIGIN_LON: f64 = 121.5654;

/// Fuel level of a freshly joined or refueled driver.
pub const FULL_FUEL: i32 = 10;

/// Driver ids of the synthetic roster start right after this value.
pub const DRIVER_ID_BASE: u32 = 1000;

/// Default TCP port of the dispatch server.
pub const DEFAULT_PORT: u16 = 9000;

/// Default number of worker processes.
pub const DEFAULT_WORKER_COUNT: usize = 100;

/// Default size of the synthetic driver roster.
pub const DEFAULT_DRIVER_COUNT: usize = 10;

/// Default snapshot file written at shutdown.
pub const DEFAULT_SNAPSHOT_FILE: &str = "server.dat";

/// Default directory holding shared memory segments.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Default base name of the shared state segment.
pub const DEFAULT_SEGMENT_NAME: &str = "ride_dispatch";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ride_dispatch/server.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_DRIVERS > 0 && MAX_DRIVERS <= u32::MAX as usize);
        assert!(MAX_PENDING_RIDES > 0);
        assert!(MAX_CLIENTS > VIP_CLIENT_ID_MAX as usize);
        assert!(RATE_LIMIT_PER_SECOND > 0);
        assert!(FULL_FUEL > 0);
    }

    #[test]
    fn vip_threshold_is_a_valid_rating() {
        assert!((1.0..=5.0).contains(&VIP_RATING_THRESHOLD));
    }
}
