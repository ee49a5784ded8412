//! End-to-end ride dispatch over TCP: confirmations, fares, matching
//! strategies and admission control.

mod common;

use common::{align_to_second_start, driver, request_ride, start_with_drivers};
use dispatch_common::config::DispatchMode;
use dispatch_server::RideReply;
use tempfile::TempDir;

// ─── Basic mode ─────────────────────────────────────────────────────

#[test]
fn test_standard_ride_charges_base_fare() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(&dir, 2, DispatchMode::Basic, &[driver(1001, 0.002, 5.0)]);

    let reply = request_ride(&server, 50);
    let RideReply::Confirmed { driver_id, text } = &reply else {
        panic!("expected confirmation, got {reply:?}");
    };
    assert_eq!(*driver_id, 1001);
    assert_eq!(
        text,
        "Ride Confirmed! Driver ID: 1001 (Rating: 5.0, Dist: 0.0020) [Mode: BASIC]"
    );

    let state = server.store().lock().unwrap();
    let assigned = state.drivers()[0];
    assert!(!assigned.is_available);
    assert_eq!(assigned.fuel, 9);
    assert_eq!(assigned.rides_count, 1);
    assert!(assigned.has_target);
    assert_eq!(state.total_revenue, 100);
    assert_eq!(state.total_requests_handled, 1);
    assert_eq!(state.total_success_requests, 1);
    drop(state);

    server.shutdown().unwrap();
}

#[test]
fn test_vip_ride_charges_surcharge() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(&dir, 2, DispatchMode::Basic, &[driver(1001, 0.002, 5.0)]);

    assert!(matches!(request_ride(&server, 7), RideReply::Confirmed { .. }));
    assert_eq!(server.store().lock().unwrap().total_revenue, 150);

    server.shutdown().unwrap();
}

#[test]
fn test_no_drivers_reply_leaves_counters() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(&dir, 2, DispatchMode::Basic, &[driver(1001, 0.002, 5.0)]);

    assert!(matches!(request_ride(&server, 50), RideReply::Confirmed { .. }));
    assert_eq!(request_ride(&server, 51), RideReply::NoDrivers);

    let state = server.store().lock().unwrap();
    assert_eq!(state.total_requests_handled, 1);
    assert_eq!(state.total_revenue, 100);
    drop(state);

    server.shutdown().unwrap();
}

// ─── Smart mode ─────────────────────────────────────────────────────

#[test]
fn test_smart_vip_prefers_high_rating() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(
        &dir,
        2,
        DispatchMode::Smart,
        &[driver(1001, 0.0005, 4.0), driver(1002, 0.0080, 4.9)],
    );

    let reply = request_ride(&server, 3);
    assert_eq!(reply.driver_id(), Some(1002));
    let RideReply::Confirmed { text, .. } = reply else {
        unreachable!()
    };
    assert!(text.ends_with("[Mode: SMART]"));

    server.shutdown().unwrap();
}

#[test]
fn test_smart_non_vip_takes_nearest() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(
        &dir,
        2,
        DispatchMode::Smart,
        &[driver(1001, 0.0005, 4.0), driver(1002, 0.0080, 4.9)],
    );

    assert_eq!(request_ride(&server, 42).driver_id(), Some(1001));
    server.shutdown().unwrap();
}

#[test]
fn test_smart_vip_falls_back_when_no_high_rating_free() {
    let dir = TempDir::new().unwrap();
    let server = start_with_drivers(
        &dir,
        2,
        DispatchMode::Smart,
        &[driver(1001, 0.0005, 4.0), driver(1002, 0.0080, 4.9)],
    );

    assert_eq!(request_ride(&server, 2).driver_id(), Some(1002));
    assert_eq!(request_ride(&server, 4).driver_id(), Some(1001));
    assert_eq!(request_ride(&server, 5), RideReply::NoDrivers);

    server.shutdown().unwrap();
}

// ─── Admission control ──────────────────────────────────────────────

#[test]
fn test_fourth_request_in_one_second_is_blocked() {
    let dir = TempDir::new().unwrap();
    let drivers: Vec<_> = (0..6).map(|i| driver(1001 + i, 0.001 * f64::from(i + 1), 4.5)).collect();
    let server = start_with_drivers(&dir, 2, DispatchMode::Basic, &drivers);

    align_to_second_start();
    let replies: Vec<RideReply> = (0..4).map(|_| request_ride(&server, 500)).collect();

    assert!(replies[..3].iter().all(|r| matches!(r, RideReply::Confirmed { .. })));
    assert_eq!(replies[3], RideReply::Blocked);

    // A different client is unaffected.
    assert!(matches!(request_ride(&server, 501), RideReply::Confirmed { .. }));

    let state = server.store().lock().unwrap();
    assert_eq!(state.total_success_requests, 4);
    drop(state);

    server.shutdown().unwrap();
}
