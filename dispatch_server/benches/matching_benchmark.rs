//! Request path hot spots: checksum, cipher, driver search and the full
//! locked dispatch step.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dispatch_common::config::DispatchMode;
use dispatch_common::consts::{MAX_DRIVERS, ORIGIN_LAT, ORIGIN_LON};
use dispatch_common::crypto::{derive_session_key, rc4_crypt};
use dispatch_common::protocol::{RideRequestPayload, RideType, calculate_checksum};
use dispatch_server::dispatch::handle_ride_request;
use dispatch_server::matching::find_driver;
use dispatch_shared_memory::SharedState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn bench_checksum(c: &mut Criterion) {
    let payload = RideRequestPayload::new(42, RideType::Normal, ORIGIN_LAT, ORIGIN_LON).to_bytes();
    c.bench_function("checksum_ride_request", |b| {
        b.iter(|| calculate_checksum(black_box(&payload)))
    });
}

fn bench_cipher(c: &mut Criterion) {
    let key = derive_session_key(1_234_567_890);
    let mut reply = *b"Ride Confirmed! Driver ID: 1001 (Rating: 4.9, Dist: 0.0031) [Mode: SMART]";
    c.bench_function("rc4_reply", |b| {
        b.iter(|| rc4_crypt(black_box(&mut reply), key.as_bytes()))
    });
}

fn bench_find_driver(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_driver");
    for count in [10usize, 64, MAX_DRIVERS] {
        let mut state = SharedState::boxed();
        state.seed_roster(count, &mut StdRng::seed_from_u64(7));
        // Leave only the last driver free so every scan covers the table.
        for driver in state.drivers_mut().iter_mut().rev().skip(1) {
            driver.is_available = false;
        }

        for mode in [DispatchMode::Basic, DispatchMode::Smart] {
            group.bench_with_input(BenchmarkId::new(mode.label(), count), &state, |b, state| {
                b.iter(|| find_driver(black_box(state.drivers()), mode, true))
            });
        }
    }
    group.finish();
}

fn bench_dispatch_cycle(c: &mut Criterion) {
    let mut state = SharedState::boxed();
    let mut rng = StdRng::seed_from_u64(9);
    let request = RideRequestPayload::new(500, RideType::Normal, ORIGIN_LAT, ORIGIN_LON);

    c.bench_function("seed_and_dispatch", |b| {
        b.iter(|| {
            state.seed_roster(10, &mut rng);
            let outcome = handle_ride_request(&mut state, black_box(&request), 0, &mut rng);
            black_box(outcome)
        })
    });
}

criterion_group!(
    benches,
    bench_checksum,
    bench_cipher,
    bench_find_driver,
    bench_dispatch_cycle
);
criterion_main!(benches);
