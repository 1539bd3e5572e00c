use crate::agents::vehicle::{CarID, VehiclePhase};
use crate::network::graph::BLOCKED_WEIGHT;
use crate::network::road::RoadID;
use crate::scheduler::scheduler::{Scheduler, SchedulerError};
use std::collections::HashMap;
use std::fmt;

/// A detected inconsistency of the shared occupancy grid or the derived
/// bookkeeping. Any of these is a programming error; the run aborts.
#[derive(Debug, Clone)]
pub enum InvariantError {
    /// A referenced vehicle does not exist in the storage.
    MissingVehicle { car: CarID },
    /// A referenced road does not exist.
    UnknownRoad { road: RoadID },
    /// A cell did not hold the vehicle the bookkeeping claimed.
    CellMismatch {
        car: CarID,
        road: RoadID,
        lane: usize,
        cell: usize,
    },
    /// A vehicle was about to be written into an occupied or absent cell.
    CellCollision {
        car: CarID,
        road: RoadID,
        lane: usize,
        cell: usize,
    },
    /// A vehicle occupies a lane in a phase that forbids it.
    StrayPhase { car: CarID, phase: VehiclePhase },
    /// An on-network vehicle is referenced by a number of cells other than one.
    OccupancyCount { car: CarID, count: usize },
    /// A cell and its occupant's position fields disagree.
    BackRefMismatch {
        car: CarID,
        road: RoadID,
        lane: usize,
        cell: usize,
    },
    /// Free cells plus occupants no longer add up to the road capacity.
    CapacityMismatch {
        road: RoadID,
        free: i64,
        occupied: i64,
        capacity: i64,
    },
    /// A vehicle is faster than its lane or itself allows.
    SpeedBound { car: CarID, speed: i64, bound: i64 },
    /// An arrived vehicle still sits on a lane.
    ArrivedOnLane { car: CarID },
    /// An edge weight does not match the road's current entry conditions.
    WeightMismatch {
        road: RoadID,
        expected: f64,
        actual: f64,
    },
}

impl fmt::Display for InvariantError {
    /// Formats the error message for `InvariantError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::MissingVehicle { car } => {
                write!(f, "Vehicle '{}' is not present in the storage", car)
            }
            InvariantError::UnknownRoad { road } => {
                write!(f, "Road '{}' is not present in the network", road)
            }
            InvariantError::CellMismatch { car, road, lane, cell } => {
                write!(
                    f,
                    "Cell {}/{}/{} did not hold vehicle '{}'",
                    road, lane, cell, car
                )
            }
            InvariantError::CellCollision { car, road, lane, cell } => {
                write!(
                    f,
                    "Vehicle '{}' cannot be written into occupied cell {}/{}/{}",
                    car, road, lane, cell
                )
            }
            InvariantError::StrayPhase { car, phase } => {
                write!(f, "Vehicle '{}' occupies a lane while {}", car, phase)
            }
            InvariantError::OccupancyCount { car, count } => {
                write!(
                    f,
                    "Vehicle '{}' is referenced by {} cells instead of exactly one",
                    car, count
                )
            }
            InvariantError::BackRefMismatch { car, road, lane, cell } => {
                write!(
                    f,
                    "Vehicle '{}' does not point back at its cell {}/{}/{}",
                    car, road, lane, cell
                )
            }
            InvariantError::CapacityMismatch {
                road,
                free,
                occupied,
                capacity,
            } => {
                write!(
                    f,
                    "Road '{}' accounts {} free + {} occupied cells against capacity {}",
                    road, free, occupied, capacity
                )
            }
            InvariantError::SpeedBound { car, speed, bound } => {
                write!(
                    f,
                    "Vehicle '{}' drives at {} above its bound {}",
                    car, speed, bound
                )
            }
            InvariantError::ArrivedOnLane { car } => {
                write!(f, "Arrived vehicle '{}' still occupies a lane", car)
            }
            InvariantError::WeightMismatch {
                road,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Road '{}' edge weight is {} but entry conditions give {}",
                    road, actual, expected
                )
            }
        }
    }
}

impl std::error::Error for InvariantError {}

impl Scheduler {
    /// Checks the universal invariants of the grid and the routing graph.
    ///
    /// Runs after every tick: each on-network vehicle occupies exactly the
    /// cell it points at, capacities add up, speeds respect lane and vehicle
    /// bounds, arrived vehicles hold no cell, and every edge weight matches
    /// its road's current entry conditions.
    pub(crate) fn check_invariants(&self) -> Result<(), SchedulerError> {
        let mut reference_counts: HashMap<CarID, usize> = HashMap::new();

        for (road_id, road) in self.roads.iter() {
            let mut occupied = 0i64;
            for (lane_idx, lane) in road.lanes().iter().enumerate() {
                for (cell, car) in lane.iter_vehicles() {
                    occupied += 1;
                    *reference_counts.entry(car).or_insert(0) += 1;
                    let vehicle = self
                        .vehicles
                        .get(&car)
                        .ok_or(InvariantError::MissingVehicle { car })?;
                    if vehicle.phase == VehiclePhase::Arrived {
                        return Err(InvariantError::ArrivedOnLane { car }.into());
                    }
                    if !vehicle.is_on_network() {
                        return Err(InvariantError::StrayPhase {
                            car,
                            phase: vehicle.phase,
                        }
                        .into());
                    }
                    if vehicle.on_road != Some(*road_id)
                        || vehicle.on_lane != lane_idx
                        || vehicle.on_cell != cell
                    {
                        return Err(InvariantError::BackRefMismatch {
                            car,
                            road: *road_id,
                            lane: lane_idx,
                            cell,
                        }
                        .into());
                    }
                    let bound = vehicle.effective_speed(lane.get_speed_limit());
                    if vehicle.current_speed > bound {
                        return Err(InvariantError::SpeedBound {
                            car,
                            speed: vehicle.current_speed,
                            bound,
                        }
                        .into());
                    }
                }
            }
            let free = road.free_count() as i64;
            if free + occupied != road.capacity() {
                return Err(InvariantError::CapacityMismatch {
                    road: *road_id,
                    free,
                    occupied,
                    capacity: road.capacity(),
                }
                .into());
            }
        }

        for car in &self.running {
            let count = reference_counts.get(car).copied().unwrap_or(0);
            if count != 1 {
                return Err(InvariantError::OccupancyCount { car: *car, count }.into());
            }
        }

        for (road_id, road) in self.roads.iter() {
            let expected = match road.entry_speed(&self.vehicles) {
                Some(speed) => road.get_length() as f64 / speed as f64,
                None => BLOCKED_WEIGHT,
            };
            let actual = self.net.weight_of(*road_id).unwrap_or(f64::NAN);
            if !((expected - actual).abs() <= 1e-9) {
                return Err(InvariantError::WeightMismatch {
                    road: *road_id,
                    expected,
                    actual,
                }
                .into());
            }
        }

        Ok(())
    }
}
