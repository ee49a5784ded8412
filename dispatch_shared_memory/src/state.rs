//! Fixed-layout shared state aggregate.
//!
//! Every type here is `#[repr(C)]` and valid when all bytes are zero, so a
//! freshly truncated segment file is already an empty [`SharedState`].
//! Collaborator processes attach to the same mapping and read these fields
//! directly while holding the shared lock.

use crate::error::{ShmError, ShmResult};
use dispatch_common::config::DispatchMode;
use dispatch_common::consts::{
    DRIVER_ID_BASE, FULL_FUEL, MAX_CLIENTS, MAX_DRIVERS, MAX_PENDING_RIDES, ORIGIN_LAT,
    ORIGIN_LON,
};
use rand::Rng;
use std::fmt;

/// Coordinate step used for synthetic positions and trip targets.
pub const GRID_STEP: f64 = 0.0001;

/// One driver record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Driver {
    pub driver_id: u32,
    pub lat: f64,
    pub lon: f64,
    pub is_available: bool,
    pub rides_count: u32,
    /// 0..=10
    pub fuel: i32,
    pub is_refueling: bool,
    /// 1.0..=5.0, 0.0 for drivers that joined over the wire
    pub rating: f64,
    /// Set when a trip is assigned; cleared by the movement collaborator.
    pub has_target: bool,
    pub target_lat: f64,
    pub target_lon: f64,
}

/// Operational status derived from the availability and refueling flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Available,
    Busy,
    Refueling,
}

impl DriverStatus {
    /// Upper-case label used by status dumps.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Busy => "BUSY",
            Self::Refueling => "REFUELING",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Driver {
    /// All-zero record.
    pub const EMPTY: Self = Self {
        driver_id: 0,
        lat: 0.0,
        lon: 0.0,
        is_available: false,
        rides_count: 0,
        fuel: 0,
        is_refueling: false,
        rating: 0.0,
        has_target: false,
        target_lat: 0.0,
        target_lon: 0.0,
    };

    /// Driver registered through a driver-join message: available with a
    /// full tank, unrated, parked at the zero coordinate.
    pub const fn joined(driver_id: u32) -> Self {
        Self {
            driver_id,
            is_available: true,
            fuel: FULL_FUEL,
            ..Self::EMPTY
        }
    }

    pub fn status(&self) -> DriverStatus {
        if self.is_refueling {
            DriverStatus::Refueling
        } else if self.is_available {
            DriverStatus::Available
        } else {
            DriverStatus::Busy
        }
    }
}

/// Reserved multi-stage ride slot. Not populated by the dispatch path.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRide {
    pub ride_id: u32,
    pub client_id: u32,
    pub start_lat: f64,
    pub start_lon: f64,
    pub status: u8,
}

impl PendingRide {
    /// All-zero record.
    pub const EMPTY: Self = Self {
        ride_id: 0,
        client_id: 0,
        start_lat: 0.0,
        start_lon: 0.0,
        status: 0,
    };
}

/// Root aggregate shared by every worker.
///
/// Mutated only through a [`crate::store::StateGuard`], i.e. while the
/// shared lock is held.
#[repr(C)]
#[derive(Clone)]
pub struct SharedState {
    pub drivers: [Driver; MAX_DRIVERS],
    pub driver_count: u32,
    pub pending_rides: [PendingRide; MAX_PENDING_RIDES],
    pub ride_count: u32,
    pub total_requests_handled: u64,
    pub total_success_requests: u64,
    pub total_revenue: i64,
    /// Unix second of each client's last request.
    pub client_last_seen: [i64; MAX_CLIENTS],
    /// Requests seen from each client within `client_last_seen`.
    pub client_req_count: [u32; MAX_CLIENTS],
    /// Raw [`DispatchMode`]: 0 = basic, anything else = smart.
    pub dispatch_mode: u32,
}

impl SharedState {
    /// Empty state: no drivers, zero counters, basic mode.
    pub const EMPTY: Self = Self {
        drivers: [Driver::EMPTY; MAX_DRIVERS],
        driver_count: 0,
        pending_rides: [PendingRide::EMPTY; MAX_PENDING_RIDES],
        ride_count: 0,
        total_requests_handled: 0,
        total_success_requests: 0,
        total_revenue: 0,
        client_last_seen: [0; MAX_CLIENTS],
        client_req_count: [0; MAX_CLIENTS],
        dispatch_mode: 0,
    };

    /// Heap-allocated empty state.
    pub fn boxed() -> Box<Self> {
        Box::new(Self::EMPTY)
    }

    /// Live driver count, clamped to capacity.
    pub fn driver_count(&self) -> usize {
        (self.driver_count as usize).min(MAX_DRIVERS)
    }

    /// Live drivers.
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers[..self.driver_count()]
    }

    /// Live drivers, mutable.
    pub fn drivers_mut(&mut self) -> &mut [Driver] {
        let count = self.driver_count();
        &mut self.drivers[..count]
    }

    /// Live pending rides.
    pub fn pending_rides(&self) -> &[PendingRide] {
        let count = (self.ride_count as usize).min(MAX_PENDING_RIDES);
        &self.pending_rides[..count]
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        DispatchMode::from_raw(self.dispatch_mode)
    }

    pub fn set_dispatch_mode(&mut self, mode: DispatchMode) {
        self.dispatch_mode = mode.as_raw();
    }

    /// Append a driver and return its index.
    ///
    /// # Errors
    ///
    /// [`ShmError::CapacityExceeded`] when the driver table is full.
    pub fn add_driver(&mut self, driver: Driver) -> ShmResult<usize> {
        let index = self.driver_count();
        if index >= MAX_DRIVERS {
            return Err(ShmError::CapacityExceeded {
                table: "driver",
                capacity: MAX_DRIVERS,
            });
        }
        self.drivers[index] = driver;
        self.driver_count = (index + 1) as u32;
        Ok(index)
    }

    /// Reset to empty and synthesize `count` drivers (clamped to capacity)
    /// around the dispatch origin.
    ///
    /// Ids run from 1001. The first two drivers are rated 4.9 or 5.0, the
    /// rest 3.5 to 4.9 in steps of 0.1.
    pub fn seed_roster<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        *self = Self::EMPTY;

        for i in 0..count.min(MAX_DRIVERS) {
            let rating = if i < 2 {
                4.9 + f64::from(rng.gen_range(0..2u8)) / 10.0
            } else {
                3.5 + f64::from(rng.gen_range(0..15u8)) / 10.0
            };
            self.drivers[i] = Driver {
                driver_id: DRIVER_ID_BASE + i as u32 + 1,
                lat: ORIGIN_LAT + f64::from(rng.gen_range(0..100u8)) * GRID_STEP,
                lon: ORIGIN_LON + f64::from(rng.gen_range(0..100u8)) * GRID_STEP,
                is_available: true,
                fuel: FULL_FUEL,
                rating,
                ..Driver::EMPTY
            };
        }
        self.driver_count = count.min(MAX_DRIVERS) as u32;
    }

    /// Repair a state read back from disk.
    ///
    /// Counts are clamped to capacity and every driver is forced available
    /// and not refueling: in-flight trips cannot survive a restart.
    pub fn normalize_after_restore(&mut self) {
        self.driver_count = self.driver_count().min(MAX_DRIVERS) as u32;
        self.ride_count = (self.ride_count as usize).min(MAX_PENDING_RIDES) as u32;
        for driver in self.drivers_mut() {
            driver.is_available = true;
            driver.is_refueling = false;
        }
    }
}

impl fmt::Debug for SharedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("driver_count", &self.driver_count)
            .field("ride_count", &self.ride_count)
            .field("total_requests_handled", &self.total_requests_handled)
            .field("total_success_requests", &self.total_success_requests)
            .field("total_revenue", &self.total_revenue)
            .field("dispatch_mode", &self.dispatch_mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_seed_roster() {
        let mut state = SharedState::boxed();
        let mut rng = StdRng::seed_from_u64(1);
        state.seed_roster(10, &mut rng);

        assert_eq!(state.driver_count(), 10);
        for (i, driver) in state.drivers().iter().enumerate() {
            assert_eq!(driver.driver_id, 1001 + i as u32);
            assert!(driver.is_available);
            assert!(!driver.is_refueling);
            assert_eq!(driver.fuel, FULL_FUEL);
            assert!(!driver.has_target);
            assert!(driver.lat >= ORIGIN_LAT && driver.lat < ORIGIN_LAT + 0.01);
            assert!(driver.lon >= ORIGIN_LON && driver.lon < ORIGIN_LON + 0.01);
            if i < 2 {
                assert!(driver.rating >= 4.85);
            } else {
                assert!((3.45..4.95).contains(&driver.rating));
            }
        }
    }

    #[test]
    fn test_seed_roster_clamps_to_capacity() {
        let mut state = SharedState::boxed();
        state.seed_roster(MAX_DRIVERS + 50, &mut StdRng::seed_from_u64(2));
        assert_eq!(state.driver_count(), MAX_DRIVERS);
    }

    #[test]
    fn test_add_driver_until_full() {
        let mut state = SharedState::boxed();
        for i in 0..MAX_DRIVERS {
            assert_eq!(state.add_driver(Driver::joined(i as u32)).unwrap(), i);
        }
        assert!(matches!(
            state.add_driver(Driver::joined(9999)),
            Err(ShmError::CapacityExceeded { capacity: MAX_DRIVERS, .. })
        ));
        assert_eq!(state.driver_count(), MAX_DRIVERS);
    }

    #[test]
    fn test_joined_driver_defaults() {
        let driver = Driver::joined(77);
        assert_eq!(driver.driver_id, 77);
        assert!(driver.is_available);
        assert_eq!(driver.fuel, FULL_FUEL);
        assert_eq!(driver.rating, 0.0);
        assert_eq!(driver.status(), DriverStatus::Available);
    }

    #[test]
    fn test_normalize_after_restore() {
        let mut state = SharedState::boxed();
        state.seed_roster(3, &mut StdRng::seed_from_u64(3));
        state.drivers[0].is_available = false;
        state.drivers[1].is_refueling = true;
        state.ride_count = 9999;

        state.normalize_after_restore();

        assert!(state.drivers().iter().all(|d| d.status() == DriverStatus::Available));
        assert_eq!(state.ride_count as usize, MAX_PENDING_RIDES);
    }

    #[test]
    fn test_status_labels() {
        let mut driver = Driver::joined(1);
        driver.is_available = false;
        assert_eq!(driver.status().to_string(), "BUSY");
        driver.is_refueling = true;
        assert_eq!(driver.status().to_string(), "REFUELING");
    }

    #[test]
    fn test_dispatch_mode_round_trip() {
        let mut state = SharedState::boxed();
        assert_eq!(state.dispatch_mode(), DispatchMode::Basic);
        state.set_dispatch_mode(DispatchMode::Smart);
        assert_eq!(state.dispatch_mode, 1);
    }
}
