//! Resource ledger: driver lifecycle transitions and revenue accounting.

use crate::matching::{Match, is_dispatchable};
use dispatch_common::consts::{BASE_FARE, ORIGIN_LAT, ORIGIN_LON, VIP_SURCHARGE};
use dispatch_shared_memory::SharedState;
use dispatch_shared_memory::state::GRID_STEP;
use rand::Rng;

/// Flat fare for a confirmed ride.
pub fn ride_fare(vip: bool) -> i64 {
    if vip { BASE_FARE + VIP_SURCHARGE } else { BASE_FARE }
}

/// Result of committing a ride to a driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    /// Slot in the driver table.
    pub index: usize,
    pub driver_id: u32,
    /// Driver rating, echoed in the confirmation.
    pub rating: f64,
    /// Distance from the dispatch origin at assignment time.
    pub distance: f64,
    /// Amount added to revenue.
    pub fare: i64,
    /// Trip destination latitude.
    pub target_lat: f64,
    /// Trip destination longitude.
    pub target_lon: f64,
}

/// Commit a match: the driver becomes busy, burns one unit of fuel and
/// receives a random destination; the success counters and revenue grow.
///
/// Caller must hold the shared lock since the search that produced `found`.
pub fn assign_ride<R: Rng + ?Sized>(
    state: &mut SharedState,
    found: Match,
    vip: bool,
    rng: &mut R,
) -> Assignment {
    let fare = ride_fare(vip);
    let target_lat = ORIGIN_LAT + f64::from(rng.gen_range(0..90u8)) * GRID_STEP;
    let target_lon = ORIGIN_LON + f64::from(rng.gen_range(0..180u8)) * GRID_STEP;

    let driver = &mut state.drivers[found.index];
    driver.is_available = false;
    driver.rides_count += 1;
    driver.fuel -= 1;
    driver.has_target = true;
    driver.target_lat = target_lat;
    driver.target_lon = target_lon;
    let (driver_id, rating) = (driver.driver_id, driver.rating);

    state.total_requests_handled += 1;
    state.total_success_requests += 1;
    state.total_revenue += fare;

    Assignment {
        index: found.index,
        driver_id,
        rating,
        distance: found.distance,
        fare,
        target_lat,
        target_lon,
    }
}

/// Trip finished: the driver arrives at its target and rejoins the pool.
///
/// Used by the movement collaborator. Returns `false` for an index outside
/// the live table.
pub fn release_driver(state: &mut SharedState, index: usize) -> bool {
    let Some(driver) = state.drivers_mut().get_mut(index) else {
        return false;
    };
    if driver.has_target {
        driver.lat = driver.target_lat;
        driver.lon = driver.target_lon;
    }
    driver.has_target = false;
    driver.is_available = true;
    driver.is_refueling = false;
    true
}

/// Whether the driver at `index` can take a ride right now.
pub fn driver_ready(state: &SharedState, index: usize) -> bool {
    state.drivers().get(index).is_some_and(is_dispatchable)
}
