//! Benchmarks for the two expensive paths: the one-time fingerprint build
//! and the per-observation KNN estimate.

use criterion::{criterion_group, criterion_main, Criterion};

use aislenav_core::fingerprint::FingerprintStore;
use aislenav_core::simulator::SignalSimulator;
use aislenav_logic::geometry::GridPos;
use aislenav_logic::grid::{Rect, VenueGrid};
use aislenav_logic::knn;
use aislenav_logic::signal::RadioParams;

/// A 60×100 venue (30×50 m at 0.5 m cells) with a few aisle blocks and
/// four corner beacons — roughly the reference store layout.
fn reference_venue() -> VenueGrid {
    let mut v = VenueGrid::new(60, 100, 0.5);
    v.place_obstacle(Rect::new(10, 15, 30, 3)).unwrap();
    v.place_obstacle(Rect::new(10, 45, 30, 3)).unwrap();
    v.place_obstacle(Rect::new(10, 75, 30, 3)).unwrap();
    v.place_beacon(GridPos::new(2, 2)).unwrap();
    v.place_beacon(GridPos::new(2, 97)).unwrap();
    v.place_beacon(GridPos::new(57, 2)).unwrap();
    v.place_beacon(GridPos::new(57, 97)).unwrap();
    v
}

fn bench_fingerprint_build(c: &mut Criterion) {
    let venue = reference_venue();
    c.bench_function("fingerprint_build_60x100_4_beacons", |b| {
        b.iter(|| {
            let mut sim = SignalSimulator::new(RadioParams::default(), 42);
            FingerprintStore::build(&venue, &mut sim)
        })
    });
}

fn bench_knn_estimate(c: &mut Criterion) {
    let venue = reference_venue();
    let mut sim = SignalSimulator::new(RadioParams::default(), 42);
    let store = FingerprintStore::build(&venue, &mut sim);
    let observed = sim.observe(&venue, GridPos::new(30, 50));

    c.bench_function("knn_estimate_weighted_k3", |b| {
        b.iter(|| knn::estimate(&observed, store.entries(), 3, true).unwrap())
    });
}

criterion_group!(benches, bench_fingerprint_build, bench_knn_estimate);
criterion_main!(benches);
