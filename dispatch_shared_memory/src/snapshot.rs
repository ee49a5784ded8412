//! Snapshot encoding and atomic persistence.
//!
//! A snapshot is the magic `RDSNAP01` followed by every [`SharedState`]
//! field in declaration order, little-endian, with every table written at
//! full capacity. The size is therefore fixed; any other size is corrupt.
//! The lock is not part of the image.

use crate::error::{ShmError, ShmResult};
use crate::state::{Driver, PendingRide, SharedState};
use bytes::{Buf, BufMut, BytesMut};
use dispatch_common::consts::{MAX_CLIENTS, MAX_DRIVERS, MAX_PENDING_RIDES};
use static_assertions::const_assert_eq;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Leading magic bytes.
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"RDSNAP01";

const DRIVER_RECORD_SIZE: usize = 4 + 8 + 8 + 1 + 4 + 4 + 1 + 8 + 1 + 8 + 8;
const RIDE_RECORD_SIZE: usize = 4 + 4 + 8 + 8 + 1;

/// Exact size of every snapshot file.
pub const SNAPSHOT_SIZE: usize = 8 // magic
    + MAX_DRIVERS * DRIVER_RECORD_SIZE
    + 4 // driver_count
    + MAX_PENDING_RIDES * RIDE_RECORD_SIZE
    + 4 // ride_count
    + 8 * 3 // totals
    + MAX_CLIENTS * (8 + 4)
    + 4; // dispatch_mode

const_assert_eq!(SNAPSHOT_SIZE, 41_324);

fn put_driver(buf: &mut BytesMut, d: &Driver) {
    buf.put_u32_le(d.driver_id);
    buf.put_f64_le(d.lat);
    buf.put_f64_le(d.lon);
    buf.put_u8(u8::from(d.is_available));
    buf.put_u32_le(d.rides_count);
    buf.put_i32_le(d.fuel);
    buf.put_u8(u8::from(d.is_refueling));
    buf.put_f64_le(d.rating);
    buf.put_u8(u8::from(d.has_target));
    buf.put_f64_le(d.target_lat);
    buf.put_f64_le(d.target_lon);
}

fn get_driver(buf: &mut &[u8]) -> Driver {
    Driver {
        driver_id: buf.get_u32_le(),
        lat: buf.get_f64_le(),
        lon: buf.get_f64_le(),
        is_available: buf.get_u8() != 0,
        rides_count: buf.get_u32_le(),
        fuel: buf.get_i32_le(),
        is_refueling: buf.get_u8() != 0,
        rating: buf.get_f64_le(),
        has_target: buf.get_u8() != 0,
        target_lat: buf.get_f64_le(),
        target_lon: buf.get_f64_le(),
    }
}

fn put_ride(buf: &mut BytesMut, r: &PendingRide) {
    buf.put_u32_le(r.ride_id);
    buf.put_u32_le(r.client_id);
    buf.put_f64_le(r.start_lat);
    buf.put_f64_le(r.start_lon);
    buf.put_u8(r.status);
}

fn get_ride(buf: &mut &[u8]) -> PendingRide {
    PendingRide {
        ride_id: buf.get_u32_le(),
        client_id: buf.get_u32_le(),
        start_lat: buf.get_f64_le(),
        start_lon: buf.get_f64_le(),
        status: buf.get_u8(),
    }
}

/// Encode the full state image.
pub fn encode_snapshot(state: &SharedState) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(SNAPSHOT_SIZE);
    buf.put_slice(SNAPSHOT_MAGIC);

    for driver in &state.drivers {
        put_driver(&mut buf, driver);
    }
    buf.put_u32_le(state.driver_count);
    for ride in &state.pending_rides {
        put_ride(&mut buf, ride);
    }
    buf.put_u32_le(state.ride_count);
    buf.put_u64_le(state.total_requests_handled);
    buf.put_u64_le(state.total_success_requests);
    buf.put_i64_le(state.total_revenue);
    for &seen in &state.client_last_seen {
        buf.put_i64_le(seen);
    }
    for &count in &state.client_req_count {
        buf.put_u32_le(count);
    }
    buf.put_u32_le(state.dispatch_mode);

    debug_assert_eq!(buf.len(), SNAPSHOT_SIZE);
    buf.to_vec()
}

/// Decode a state image.
///
/// # Errors
///
/// [`ShmError::CorruptSnapshot`] on a size mismatch or bad magic. No
/// partial state is ever returned.
pub fn decode_snapshot(bytes: &[u8]) -> ShmResult<Box<SharedState>> {
    if bytes.len() != SNAPSHOT_SIZE {
        return Err(ShmError::CorruptSnapshot {
            reason: format!("expected {} bytes, found {}", SNAPSHOT_SIZE, bytes.len()),
        });
    }
    if &bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
        return Err(ShmError::CorruptSnapshot {
            reason: "bad magic".to_string(),
        });
    }

    let mut buf = &bytes[SNAPSHOT_MAGIC.len()..];
    let mut state = SharedState::boxed();

    for slot in state.drivers.iter_mut() {
        *slot = get_driver(&mut buf);
    }
    state.driver_count = buf.get_u32_le();
    for slot in state.pending_rides.iter_mut() {
        *slot = get_ride(&mut buf);
    }
    state.ride_count = buf.get_u32_le();
    state.total_requests_handled = buf.get_u64_le();
    state.total_success_requests = buf.get_u64_le();
    state.total_revenue = buf.get_i64_le();
    for slot in state.client_last_seen.iter_mut() {
        *slot = buf.get_i64_le();
    }
    for slot in state.client_req_count.iter_mut() {
        *slot = buf.get_u32_le();
    }
    state.dispatch_mode = buf.get_u32_le();

    Ok(state)
}

/// Write the snapshot atomically: a temporary file in the destination
/// directory is synced and renamed over `path`.
pub fn save_snapshot(path: &Path, state: &SharedState) -> ShmResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&encode_snapshot(state))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ShmError::from(e.error))?;
    Ok(())
}

/// Read a snapshot. Returns `Ok(None)` when no file exists.
pub fn load_snapshot(path: &Path) -> ShmResult<Option<Box<SharedState>>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    decode_snapshot(&bytes).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn sample_state() -> Box<SharedState> {
        let mut state = SharedState::boxed();
        state.seed_roster(5, &mut StdRng::seed_from_u64(9));
        state.drivers[1].is_available = false;
        state.drivers[1].has_target = true;
        state.drivers[1].target_lat = 25.04;
        state.total_requests_handled = 12;
        state.total_success_requests = 11;
        state.total_revenue = 1250;
        state.client_last_seen[42] = 1_700_000_000;
        state.client_req_count[42] = 3;
        state.dispatch_mode = 1;
        state
    }

    #[test]
    fn test_snapshot_size_is_fixed() {
        assert_eq!(DRIVER_RECORD_SIZE, 55);
        assert_eq!(RIDE_RECORD_SIZE, 25);
        assert_eq!(encode_snapshot(&SharedState::boxed()).len(), SNAPSHOT_SIZE);
    }

    #[test]
    fn test_decode_restores_every_field() {
        let state = sample_state();
        let decoded = decode_snapshot(&encode_snapshot(&state)).unwrap();

        assert_eq!(decoded.drivers, state.drivers);
        assert_eq!(decoded.driver_count, 5);
        assert_eq!(decoded.total_revenue, 1250);
        assert_eq!(decoded.client_last_seen[42], 1_700_000_000);
        assert_eq!(decoded.client_req_count[42], 3);
        assert_eq!(decoded.dispatch_mode, 1);
    }

    #[test]
    fn test_wrong_size_is_corrupt() {
        let mut bytes = encode_snapshot(&sample_state());
        bytes.pop();
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(ShmError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let mut bytes = encode_snapshot(&sample_state());
        bytes[0] = b'X';
        assert!(matches!(
            decode_snapshot(&bytes),
            Err(ShmError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.dat");

        assert!(load_snapshot(&path).unwrap().is_none());

        save_snapshot(&path, &sample_state()).unwrap();
        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.total_success_requests, 11);

        // Overwrite in place.
        let mut next = sample_state();
        next.total_revenue = 9;
        save_snapshot(&path, &next).unwrap();
        assert_eq!(load_snapshot(&path).unwrap().unwrap().total_revenue, 9);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    proptest! {
        #[test]
        fn any_other_length_is_corrupt(len in 0usize..50_000) {
            prop_assume!(len != SNAPSHOT_SIZE);
            let bytes = vec![0u8; len];
            prop_assert!(
                matches!(decode_snapshot(&bytes), Err(ShmError::CorruptSnapshot { .. })),
                "length {} accepted",
                len
            );
        }
    }
}
