//! Ride request dispatch: admission, matching and ledger update as one
//! critical section.

use crate::admission::{AdmissionVerdict, check_and_update_rate_limit};
use crate::ledger::{Assignment, assign_ride};
use crate::matching::{find_driver, is_vip};
use dispatch_common::config::DispatchMode;
use dispatch_common::protocol::RideRequestPayload;
use dispatch_shared_memory::SharedState;
use rand::Rng;

/// What happened to a ride request.
#[derive(Debug, Clone, PartialEq)]
pub enum RideOutcome {
    /// A driver was assigned and counters were updated.
    Confirmed {
        assignment: Assignment,
        /// Strategy that found the driver.
        mode: DispatchMode,
    },
    /// No dispatchable driver. Counters are untouched.
    NoDrivers,
    /// Rate limit exceeded.
    Blocked,
}

impl RideOutcome {
    /// Text sent back to the client.
    pub fn message(&self) -> String {
        match self {
            Self::Confirmed { assignment, mode } => format!(
                "Ride Confirmed! Driver ID: {} (Rating: {:.1}, Dist: {:.4}) [Mode: {}]",
                assignment.driver_id, assignment.rating, assignment.distance, mode
            ),
            Self::NoDrivers => "Error: No drivers available.".to_string(),
            Self::Blocked => "Error: Blocked.".to_string(),
        }
    }

    /// Whether a driver was assigned.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Run one ride request against `state`.
///
/// VIP status comes from the client id, not the request's `ride_type`.
/// Caller must hold the shared lock for the whole call.
pub fn handle_ride_request<R: Rng + ?Sized>(
    state: &mut SharedState,
    request: &RideRequestPayload,
    now_secs: i64,
    rng: &mut R,
) -> RideOutcome {
    if check_and_update_rate_limit(state, request.client_id, now_secs) == AdmissionVerdict::Blocked {
        return RideOutcome::Blocked;
    }

    let vip = is_vip(request.client_id);
    let mode = state.dispatch_mode();

    match find_driver(state.drivers(), mode, vip) {
        Some(found) => RideOutcome::Confirmed {
            assignment: assign_ride(state, found, vip, rng),
            mode,
        },
        None => RideOutcome::NoDrivers,
    }
}
