//! Matching engine.
//!
//! Pure functions over the driver table. Distances are Euclidean in
//! coordinate space, measured from the fixed dispatch origin. Ties go to
//! the lowest index. The caller holds the shared lock across the search
//! and the ledger update that follows.

use dispatch_common::config::DispatchMode;
use dispatch_common::consts::{ORIGIN_LAT, ORIGIN_LON, VIP_CLIENT_ID_MAX, VIP_RATING_THRESHOLD};
use dispatch_shared_memory::Driver;

/// Candidates at or beyond this distance are never selected.
pub const MAX_MATCH_DISTANCE: f64 = 1_000_000.0;

/// A selected driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Index into the driver table.
    pub index: usize,
    /// Distance from the dispatch origin.
    pub distance: f64,
}

pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    ((lat1 - lat2).powi(2) + (lon1 - lon2).powi(2)).sqrt()
}

/// Whether a driver may take a ride: available, not refueling, fuel left.
pub fn is_dispatchable(driver: &Driver) -> bool {
    driver.is_available && !driver.is_refueling && driver.fuel > 0
}

/// Client ids up to 10 are VIP.
pub fn is_vip(client_id: u32) -> bool {
    client_id <= VIP_CLIENT_ID_MAX
}

fn nearest<F>(drivers: &[Driver], accept: F) -> Option<Match>
where
    F: Fn(&Driver) -> bool,
{
    let mut best: Option<Match> = None;
    let mut min_distance = MAX_MATCH_DISTANCE;

    for (index, driver) in drivers.iter().enumerate() {
        if !is_dispatchable(driver) || !accept(driver) {
            continue;
        }
        let distance = calculate_distance(ORIGIN_LAT, ORIGIN_LON, driver.lat, driver.lon);
        if distance < min_distance {
            min_distance = distance;
            best = Some(Match { index, distance });
        }
    }
    best
}

/// Nearest dispatchable driver.
pub fn find_driver_basic(drivers: &[Driver]) -> Option<Match> {
    nearest(drivers, |_| true)
}

/// VIP requests first try drivers rated at least 4.8; everyone else, and
/// VIPs with no such driver free, get the basic search.
pub fn find_driver_smart(drivers: &[Driver], vip: bool) -> Option<Match> {
    if vip {
        if let Some(found) = nearest(drivers, |d| d.rating >= VIP_RATING_THRESHOLD) {
            return Some(found);
        }
    }
    find_driver_basic(drivers)
}

/// Search with the strategy selected by `mode`.
pub fn find_driver(drivers: &[Driver], mode: DispatchMode, vip: bool) -> Option<Match> {
    match mode {
        DispatchMode::Basic => find_driver_basic(drivers),
        DispatchMode::Smart => find_driver_smart(drivers, vip),
    }
}
