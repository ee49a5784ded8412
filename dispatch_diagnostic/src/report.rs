//! Snapshot summary.

use dispatch_server::pricing::{SurgeQuote, calculate_surge_price};
use dispatch_shared_memory::{DriverStatus, SharedState};
use serde::Serialize;
use std::fmt;

/// One listed driver.
#[derive(Debug, Clone, Serialize)]
pub struct DriverLine {
    pub driver_id: u32,
    pub status: &'static str,
    pub rides: u32,
    pub fuel: i32,
    pub rating: f64,
}

/// Driver counts by status.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub available: usize,
    pub busy: usize,
    pub refueling: usize,
}

/// Everything the dump prints.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub total_requests_handled: u64,
    pub total_success_requests: u64,
    pub total_revenue: i64,
    pub dispatch_mode: &'static str,
    pub driver_count: usize,
    pub pending_rides: usize,
    pub drivers: Vec<DriverLine>,
    pub status: StatusSummary,
    pub surge: SurgeQuote,
}

impl SnapshotReport {
    /// Summarize `state`, listing at most `limit` drivers.
    pub fn build(state: &SharedState, limit: usize) -> Self {
        let mut status = StatusSummary::default();
        for driver in state.drivers() {
            match driver.status() {
                DriverStatus::Available => status.available += 1,
                DriverStatus::Busy => status.busy += 1,
                DriverStatus::Refueling => status.refueling += 1,
            }
        }

        let drivers = state
            .drivers()
            .iter()
            .take(limit)
            .map(|d| DriverLine {
                driver_id: d.driver_id,
                status: d.status().label(),
                rides: d.rides_count,
                fuel: d.fuel,
                rating: d.rating,
            })
            .collect();

        Self {
            total_requests_handled: state.total_requests_handled,
            total_success_requests: state.total_success_requests,
            total_revenue: state.total_revenue,
            dispatch_mode: state.dispatch_mode().label(),
            driver_count: state.driver_count(),
            pending_rides: state.pending_rides().len(),
            drivers,
            status,
            surge: calculate_surge_price(state),
        }
    }
}

impl fmt::Display for SnapshotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Ride Dispatch Snapshot ===")?;
        writeln!(f, "Total requests handled : {}", self.total_requests_handled)?;
        writeln!(f, "Successful requests    : {}", self.total_success_requests)?;
        writeln!(f, "Total revenue          : ${}", self.total_revenue)?;
        writeln!(f, "Dispatch mode          : {}", self.dispatch_mode)?;
        writeln!(f, "Drivers                : {}", self.driver_count)?;
        writeln!(f, "Pending rides          : {}", self.pending_rides)?;
        writeln!(f)?;

        if !self.drivers.is_empty() {
            writeln!(f, "{:<8} {:<10} {:>6} {:>5} {:>7}", "ID", "STATUS", "RIDES", "FUEL", "RATING")?;
            for d in &self.drivers {
                writeln!(
                    f,
                    "{:<8} {:<10} {:>6} {:>5} {:>7.1}",
                    d.driver_id, d.status, d.rides, d.fuel, d.rating
                )?;
            }
            if self.driver_count > self.drivers.len() {
                writeln!(f, "... {} more", self.driver_count - self.drivers.len())?;
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "Status: {} available, {} busy, {} refueling",
            self.status.available, self.status.busy, self.status.refueling
        )?;
        write!(
            f,
            "Surge quote: ${} ({}/{} busy{})",
            self.surge.fare,
            self.surge.busy,
            self.surge.total,
            if self.surge.is_surging() { ", surging" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_shared_memory::Driver;

    fn sample() -> Box<SharedState> {
        let mut state = SharedState::boxed();
        for id in 1..=4 {
            state.add_driver(Driver::joined(1000 + id)).unwrap();
        }
        state.drivers[0].is_available = false;
        state.drivers[0].rides_count = 3;
        state.drivers[1].is_available = false;
        state.drivers[1].is_refueling = true;
        state.total_requests_handled = 3;
        state.total_success_requests = 3;
        state.total_revenue = 350;
        state
    }

    #[test]
    fn test_summary_counts() {
        let report = SnapshotReport::build(&sample(), 2);

        assert_eq!(report.driver_count, 4);
        assert_eq!(report.drivers.len(), 2);
        assert_eq!(report.drivers[0].status, "BUSY");
        assert_eq!(report.drivers[1].status, "REFUELING");
        assert_eq!(
            report.status,
            StatusSummary {
                available: 2,
                busy: 1,
                refueling: 1
            }
        );
        assert_eq!(report.surge.fare, 100);
        assert_eq!(report.dispatch_mode, "BASIC");
    }

    #[test]
    fn test_text_output() {
        let text = SnapshotReport::build(&sample(), 5).to_string();
        assert!(text.contains("Total revenue          : $350"));
        assert!(text.contains("1001     BUSY"));
        assert!(text.contains("Status: 2 available, 1 busy, 1 refueling"));
        assert!(!text.contains("more"));
    }

    #[test]
    fn test_json_output() {
        let json = serde_json::to_value(SnapshotReport::build(&sample(), 1)).unwrap();
        assert_eq!(json["total_revenue"], 350);
        assert_eq!(json["drivers"].as_array().unwrap().len(), 1);
        assert_eq!(json["surge"]["fare"], 100);
        assert_eq!(json["status"]["refueling"], 1);
    }
}
