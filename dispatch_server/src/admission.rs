//! Per-client admission control.
//!
//! Each client id in `1..MAX_CLIENTS` owns a "last seen second" and a
//! request count within that second, stored in the shared state so every
//! worker sees the same table. Ids outside that range are never throttled.

use dispatch_common::consts::{MAX_CLIENTS, RATE_LIMIT_PER_SECOND};
use dispatch_shared_memory::SharedState;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionVerdict {
    Allowed,
    Blocked,
}

/// Current Unix time in whole seconds.
pub fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Record one request from `client_id` at `now_secs` and decide whether it
/// may proceed.
///
/// The record is updated even when the request is blocked, so a client
/// flooding within one second stays blocked until the second changes.
/// Caller must hold the shared lock.
pub fn check_and_update_rate_limit(
    state: &mut SharedState,
    client_id: u32,
    now_secs: i64,
) -> AdmissionVerdict {
    let slot = client_id as usize;
    if client_id == 0 || slot >= MAX_CLIENTS {
        return AdmissionVerdict::Allowed;
    }

    if state.client_last_seen[slot] == now_secs {
        state.client_req_count[slot] = state.client_req_count[slot].saturating_add(1);
    } else {
        state.client_last_seen[slot] = now_secs;
        state.client_req_count[slot] = 1;
    }

    if state.client_req_count[slot] > RATE_LIMIT_PER_SECOND {
        AdmissionVerdict::Blocked
    } else {
        AdmissionVerdict::Allowed
    }
}
