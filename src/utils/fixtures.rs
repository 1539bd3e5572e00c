//! Ready-made small networks for tests, examples and benchmarks.
use crate::agents::vehicle::Vehicle;
use crate::network::crossing::{Crossing, EMPTY_SLOT};
use crate::network::road::{Road, RoadID};

/// One unidirectional road `1 -> 2` (length 3, speed 2, two lanes) with a
/// single vehicle driving it.
///
/// # Example
/// ```
/// use traffic_sched_core::scheduler::{Scheduler, config::SchedulerConfig};
/// use traffic_sched_core::utils::fixtures::one_road_entities;
///
/// let (crosses, roads, cars) = one_road_entities();
/// let mut scheduler = Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap();
/// scheduler.run().unwrap();
/// assert_eq!(scheduler.arrived().len(), 1);
/// ```
pub fn one_road_entities() -> (Vec<Crossing>, Vec<Road>, Vec<Vehicle>) {
    let crosses = vec![
        Crossing::new(1, [1, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
        Crossing::new(2, [1, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
    ];
    let roads = vec![
        Road::new(RoadID::new(1, 1))
            .with_length(3)
            .with_speed_limit(2)
            .with_lane_count(2)
            .with_endpoints(1, 2)
            .build(),
    ];
    let cars = vec![
        Vehicle::new(1)
            .with_origin(1)
            .with_destination(2)
            .with_max_speed(2)
            .with_planned_departure(0)
            .build(),
    ];
    (crosses, roads, cars)
}

/// A plus-shaped network: center crossing 1 with arms north (2), east (3),
/// south (4) and west (5), all duplex single-lane roads of length 5 and
/// speed 2. `car_count` vehicles travel between opposite arms with staggered
/// planned departures.
pub fn plus_network_entities(car_count: usize) -> (Vec<Crossing>, Vec<Road>, Vec<Vehicle>) {
    let crosses = vec![
        Crossing::new(1, [1, 2, 3, 4]),
        Crossing::new(2, [1, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
        Crossing::new(3, [2, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
        Crossing::new(4, [3, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
        Crossing::new(5, [4, EMPTY_SLOT, EMPTY_SLOT, EMPTY_SLOT]),
    ];
    let mut roads = Vec::new();
    for (base, arm) in [(1, 2), (2, 3), (3, 4), (4, 5)] {
        for (direction, from, to) in [(1, arm, 1), (2, 1, arm)] {
            roads.push(
                Road::new(RoadID::new(base, direction))
                    .with_length(5)
                    .with_speed_limit(2)
                    .with_lane_count(1)
                    .with_endpoints(from, to)
                    .build(),
            );
        }
    }
    let arms = [2, 3, 4, 5];
    let cars = (0..car_count)
        .map(|i| {
            Vehicle::new(i as i64 + 1)
                .with_origin(arms[i % 4])
                .with_destination(arms[(i + 2) % 4])
                .with_max_speed(2)
                .with_planned_departure((i / 2) as i64)
                .build()
        })
        .collect();
    (crosses, roads, cars)
}

/// A `side x side` grid of crossings joined by duplex single-lane roads
/// (length 8, speed 4). Crossing ids are row-major starting at 1.
pub fn grid_entities(side: usize) -> (Vec<Crossing>, Vec<Road>) {
    let cross_id = |row: usize, col: usize| (row * side + col) as i64 + 1;
    let mut horizontal = vec![vec![EMPTY_SLOT; side]; side];
    let mut vertical = vec![vec![EMPTY_SLOT; side]; side];
    let mut roads = Vec::new();
    let mut next_base = 1i64;

    for row in 0..side {
        for col in 0..side {
            if col + 1 < side {
                horizontal[row][col] = next_base;
                for (direction, from, to) in [
                    (1, cross_id(row, col), cross_id(row, col + 1)),
                    (2, cross_id(row, col + 1), cross_id(row, col)),
                ] {
                    roads.push(
                        Road::new(RoadID::new(next_base, direction))
                            .with_length(8)
                            .with_speed_limit(4)
                            .with_lane_count(1)
                            .with_endpoints(from, to)
                            .build(),
                    );
                }
                next_base += 1;
            }
            if row + 1 < side {
                vertical[row][col] = next_base;
                for (direction, from, to) in [
                    (1, cross_id(row, col), cross_id(row + 1, col)),
                    (2, cross_id(row + 1, col), cross_id(row, col)),
                ] {
                    roads.push(
                        Road::new(RoadID::new(next_base, direction))
                            .with_length(8)
                            .with_speed_limit(4)
                            .with_lane_count(1)
                            .with_endpoints(from, to)
                            .build(),
                    );
                }
                next_base += 1;
            }
        }
    }

    let mut crosses = Vec::new();
    for row in 0..side {
        for col in 0..side {
            // Rotational slot order: north, east, south, west.
            let north = if row > 0 { vertical[row - 1][col] } else { EMPTY_SLOT };
            let east = horizontal[row][col];
            let south = vertical[row][col];
            let west = if col > 0 { horizontal[row][col - 1] } else { EMPTY_SLOT };
            crosses.push(Crossing::new(cross_id(row, col), [north, east, south, west]));
        }
    }
    (crosses, roads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_entities_shape() {
        let side = 4;
        let (crosses, roads) = grid_entities(side);
        assert_eq!(side * side, crosses.len());
        // 2 * side * (side - 1) undirected roads, two directions each.
        assert_eq!(2 * 2 * side * (side - 1), roads.len());
    }
}
