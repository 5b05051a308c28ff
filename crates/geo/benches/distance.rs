//! Benchmarks for geo crate distance calculations.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use worldview_geo::{Coordinate, Route, haversine_distance_meters, path_length};

fn create_path(count: usize) -> Vec<Coordinate> {
    (0..count)
        .map(|i| {
            // Zig-zag north-east out of Stuttgart
            let lat = 48.77 + i as f64 * 0.0005;
            let lng = 9.18 + (i % 2) as f64 * 0.0007;
            Coordinate::new(lat, lng).unwrap()
        })
        .collect()
}

fn bench_single_distance(c: &mut Criterion) {
    let berlin = Coordinate::new(52.5200, 13.4050).unwrap();
    let paris = Coordinate::new(48.8566, 2.3522).unwrap();

    c.bench_function("haversine_single", |b| {
        b.iter(|| haversine_distance_meters(black_box(&berlin), black_box(&paris)))
    });

    c.bench_function("interpolate_single", |b| {
        b.iter(|| black_box(&berlin).interpolate_to(black_box(&paris), black_box(0.37)))
    });
}

fn bench_path_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_length");

    for size in [10, 100, 1000, 10000].iter() {
        let path = create_path(*size);
        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| path_length(black_box(&path)))
        });
    }

    group.finish();
}

fn bench_route_construction(c: &mut Criterion) {
    let path = create_path(1000);

    c.bench_function("route_from_waypoints_1000", |b| {
        b.iter(|| Route::from_waypoints("bench", "Bench", "", black_box(path.clone()), 13.9))
    });
}

criterion_group!(
    benches,
    bench_single_distance,
    bench_path_length,
    bench_route_construction
);
criterion_main!(benches);
