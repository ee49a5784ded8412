//! Surge pricing quote.

use dispatch_common::consts::BASE_FARE;
use dispatch_shared_memory::SharedState;
use serde::Serialize;

/// Busy ratio above which the fare doubles.
pub const SURGE_THRESHOLD: f64 = 0.7;

/// Surge quote derived from the current fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurgeQuote {
    /// Drivers neither available nor refueling.
    pub busy: usize,
    pub total: usize,
    pub fare: i64,
}

impl SurgeQuote {
    pub fn is_surging(&self) -> bool {
        self.fare > BASE_FARE
    }
}

/// Quote a fare from the share of busy drivers. An empty fleet quotes the
/// base fare.
///
/// Informational only; confirmed rides are charged the flat fare.
pub fn calculate_surge_price(state: &SharedState) -> SurgeQuote {
    let drivers = state.drivers();
    let total = drivers.len();
    let busy = drivers
        .iter()
        .filter(|d| !d.is_available && !d.is_refueling)
        .count();

    let fare = if total > 0 && busy as f64 / total as f64 > SURGE_THRESHOLD {
        BASE_FARE * 2
    } else {
        BASE_FARE
    };

    SurgeQuote { busy, total, fare }
}
