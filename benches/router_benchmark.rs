use traffic_sched_core::network::graph::RoadNetwork;
use traffic_sched_core::routing::router::{k_shortest_paths, shortest_path};
use traffic_sched_core::utils::fixtures::grid_entities;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

pub fn benchmark_router(c: &mut Criterion) {
    // Build the routing graph over a 12x12 grid of crossings.
    let side = 12usize;
    let (crosses, roads) = grid_entities(side);
    let mut net = RoadNetwork::new();
    for cross in &crosses {
        net.add_crossing(cross.get_id());
    }
    for road in &roads {
        net.add_road(road).unwrap();
    }
    let source = 1i64;
    let target = (side * side) as i64;

    c.bench_function("shortest_path_dijkstra", |b| {
        b.iter(|| {
            match shortest_path(black_box(&net), black_box(source), black_box(target)) {
                Ok(path) => {
                    let _ = path;
                }
                Err(e) => panic!("Error during shortest path calculation: {:?}", e),
            }
        })
    });

    c.bench_function("k_shortest_paths_yen", |b| {
        b.iter(|| {
            let paths = k_shortest_paths(
                black_box(&net),
                black_box(source),
                black_box(target),
                black_box(10),
                black_box(100),
            );
            assert!(!paths.is_empty());
        })
    });
}

criterion_group!(benches, benchmark_router);
criterion_main!(benches);
