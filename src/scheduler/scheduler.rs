use crate::agents::vehicle::{CarID, VehiclePhase};
use crate::agents::vehicles_storage::VehiclesStorage;
use crate::network::crossing::{CrossID, Crossing, EMPTY_SLOT};
use crate::network::graph::{NetworkError, RoadNetwork};
use crate::network::road::{Road, RoadID, RoadState};
use crate::routing::path::Path;
use crate::routing::router::{k_shortest_paths, shortest_path};
use crate::routing::sampler::sample_first_road;
use crate::scheduler::config::SchedulerConfig;
use crate::scheduler::invariants::InvariantError;
use crate::utils::rand::seeded_rng;
use crate::verbose::{
    EVENT_ADMISSION, EVENT_ADMIT_VEHICLE, EVENT_ARRIVAL, EVENT_PLAN_ROUTE, EVENT_RUN_DONE,
    EVENT_RUN_START, EVENT_TICK, EVENT_UNROUTABLE, EVENT_WEIGHT_UPDATE,
};
use crate::{log_additional, log_all, log_detailed, log_main};
use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use std::fmt;
use uuid::Uuid;

/// Custom error types for `Scheduler`.
#[derive(Debug, Clone)]
pub enum SchedulerError {
    /// A road references a crossing absent from the input.
    UnknownRoadEndpoint { road: RoadID, cross: CrossID },
    /// A crossing connector slot references a road absent from the input.
    UnknownSlotRoad { cross: CrossID, base: i64 },
    /// A road is missing from the connector slots of one of its endpoints.
    RoadNotConnected { road: RoadID, cross: CrossID },
    /// A vehicle's origin or destination crossing is absent from the input.
    UnknownTripCross { car: CarID, cross: CrossID },
    /// Internal bookkeeping went inconsistent; the run must abort.
    Invariant(InvariantError),
}

impl fmt::Display for SchedulerError {
    /// Formats the error message for `SchedulerError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::UnknownRoadEndpoint { road, cross } => {
                write!(f, "Road '{}' references unknown crossing '{}'", road, cross)
            }
            SchedulerError::UnknownSlotRoad { cross, base } => {
                write!(
                    f,
                    "Crossing '{}' connector slot references unknown road '{}'",
                    cross, base
                )
            }
            SchedulerError::RoadNotConnected { road, cross } => {
                write!(
                    f,
                    "Road '{}' does not appear in the connector slots of crossing '{}'",
                    road, cross
                )
            }
            SchedulerError::UnknownTripCross { car, cross } => {
                write!(f, "Vehicle '{}' references unknown crossing '{}'", car, cross)
            }
            SchedulerError::Invariant(violation) => {
                write!(f, "Invariant violated: {}", violation)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<InvariantError> for SchedulerError {
    fn from(violation: InvariantError) -> Self {
        SchedulerError::Invariant(violation)
    }
}

/// Scheduler - tick-driven state machine producing per-vehicle departure
/// times and road sequences.
///
/// Per tick: running vehicles are re-marked pending, the drive fixed point
/// advances everything resolvable within its lane, the cross phase resolves
/// right-of-way at intersections in id order, stalled vehicles are parked at
/// their lane heads, invariants are checked, and finally garaged vehicles
/// are admitted while the network has capacity. The clock advances last.
#[derive(Debug)]
pub struct Scheduler {
    /// Unique run identifier
    id: Uuid,
    /// Tunable constants of the run
    pub(crate) config: SchedulerConfig,
    /// Crossings ascending by id
    pub(crate) crosses: IndexMap<CrossID, Crossing>,
    /// Directed roads ascending by id
    pub(crate) roads: IndexMap<RoadID, Road>,
    /// Weighted graph view used for routing
    pub(crate) net: RoadNetwork,
    /// All vehicles of the batch, ascending by id
    pub(crate) vehicles: VehiclesStorage,
    /// Vehicles waiting for admission, ordered by ideal arrival time
    pub(crate) garage: Vec<CarID>,
    /// Vehicles currently occupying lane cells
    pub(crate) running: Vec<CarID>,
    /// Vehicles that reached their destination, in arrival order
    pub(crate) arrived: Vec<CarID>,
    /// Vehicles with no route at input time; never admitted, never emitted
    pub(crate) unroutable: Vec<CarID>,
    /// Current time unit
    pub(crate) current_time: i64,
    /// Network entry capacity at or under which admission is suspended
    pub(crate) block_capacity_total: i64,
    /// Roads whose occupancy changed since the last weight sweep
    pub(crate) dirty_roads: IndexSet<RoadID>,
    /// Seeded generator behind every random draw of the run
    pub(crate) rng: StdRng,
}

impl Scheduler {
    /// Creates a scheduler over the given network and vehicle batch.
    ///
    /// Crossings, roads and vehicles are reordered ascending by id; the
    /// garage pool is arranged by precomputed ideal arrival time. Vehicles
    /// without any route are set aside and logged once.
    ///
    /// # Errors
    /// A topology error when a road endpoint, a connector slot or a trip
    /// references an entity absent from the input.
    pub fn new(
        crosses: Vec<Crossing>,
        roads: Vec<Road>,
        cars: Vec<crate::agents::vehicle::Vehicle>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let mut crosses = crosses;
        crosses.sort_by_key(|cross| cross.get_id());
        let mut roads = roads;
        roads.sort_by_key(|road| road.get_id());

        let roads_map: IndexMap<RoadID, Road> =
            roads.into_iter().map(|road| (road.get_id(), road)).collect();
        let mut crosses_map: IndexMap<CrossID, Crossing> = crosses
            .into_iter()
            .map(|cross| (cross.get_id(), cross))
            .collect();

        for road in roads_map.values() {
            for cross in [road.get_from_cross(), road.get_to_cross()] {
                if !crosses_map.contains_key(&cross) {
                    return Err(SchedulerError::UnknownRoadEndpoint {
                        road: road.get_id(),
                        cross,
                    });
                }
            }
        }
        for crossing in crosses_map.values() {
            for base in crossing.get_slots().iter().copied() {
                if base == EMPTY_SLOT {
                    continue;
                }
                let touches = roads_map.values().any(|road| {
                    road.get_id().base == base
                        && (road.get_from_cross() == crossing.get_id()
                            || road.get_to_cross() == crossing.get_id())
                });
                if !touches {
                    return Err(SchedulerError::UnknownSlotRoad {
                        cross: crossing.get_id(),
                        base,
                    });
                }
            }
        }
        for road in roads_map.values() {
            for cross in [road.get_from_cross(), road.get_to_cross()] {
                let connected = crosses_map
                    .get(&cross)
                    .map(|crossing| crossing.get_slots().contains(&road.get_id().base))
                    .unwrap_or(false);
                if !connected {
                    return Err(SchedulerError::RoadNotConnected {
                        road: road.get_id(),
                        cross,
                    });
                }
            }
        }
        for car in &cars {
            for cross in [car.origin_cross, car.dest_cross] {
                if !crosses_map.contains_key(&cross) {
                    return Err(SchedulerError::UnknownTripCross { car: car.id, cross });
                }
            }
        }

        let mut net = RoadNetwork::new();
        for cross in crosses_map.keys() {
            net.add_crossing(*cross);
        }
        for road in roads_map.values() {
            net.add_road(road).map_err(|err| match err {
                NetworkError::UnknownCrossing { road, cross } => {
                    SchedulerError::UnknownRoadEndpoint { road, cross }
                }
            })?;
        }
        for crossing in crosses_map.values_mut() {
            crossing.connect_incoming(&roads_map);
        }

        let total_capacity: i64 = roads_map.values().map(|road| road.capacity()).sum();
        let block_capacity_total =
            (total_capacity as f64 * config.capacity_threshold).floor() as i64;

        let mut cars = cars;
        cars.sort_by_key(|car| car.id);
        let garage: Vec<CarID> = cars.iter().map(|car| car.id).collect();
        let mut vehicles = VehiclesStorage::new();
        for car in cars {
            vehicles.insert_vehicle(car);
        }

        let mut scheduler = Scheduler {
            id: Uuid::new_v4(),
            rng: seeded_rng(config.rng_seed),
            config,
            crosses: crosses_map,
            roads: roads_map,
            net,
            vehicles,
            garage,
            running: Vec::new(),
            arrived: Vec::new(),
            unroutable: Vec::new(),
            current_time: 0,
            block_capacity_total,
            dirty_roads: IndexSet::new(),
        };
        scheduler.arrange_garage();
        Ok(scheduler)
    }

    /// Gets the unique run identifier
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    /// Gets the current time unit
    pub fn current_time(&self) -> i64 {
        self.current_time
    }

    /// Gets the vehicles storage
    pub fn vehicles(&self) -> &VehiclesStorage {
        &self.vehicles
    }

    /// Gets a single vehicle by id
    pub fn vehicle(&self, id: CarID) -> Option<&crate::agents::vehicle::Vehicle> {
        self.vehicles.get(&id)
    }

    /// Gets the routing graph
    pub fn network(&self) -> &RoadNetwork {
        &self.net
    }

    /// Gets the directed roads ascending by id
    pub fn roads(&self) -> &IndexMap<RoadID, Road> {
        &self.roads
    }

    /// Gets the ids of vehicles still waiting for admission
    pub fn garage(&self) -> &[CarID] {
        &self.garage
    }

    /// Gets the ids of vehicles currently on the network
    pub fn running(&self) -> &[CarID] {
        &self.running
    }

    /// Gets the ids of arrived vehicles in arrival order
    pub fn arrived(&self) -> &[CarID] {
        &self.arrived
    }

    /// Gets the ids of vehicles without any route; they are never emitted
    pub fn unroutable(&self) -> &[CarID] {
        &self.unroutable
    }

    /// Runs ticks until the garage and the network are both empty.
    ///
    /// # Errors
    /// [`SchedulerError::Invariant`] when post-tick checks detect corrupted
    /// bookkeeping; the grid must not be trusted afterwards.
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        let session = self.id.to_string();
        log_main!(
            EVENT_RUN_START,
            "Scheduling batch",
            session = session.as_str(),
            vehicles = self.vehicles.len() as u64,
            roads = self.roads.len() as u64,
            crosses = self.crosses.len() as u64
        );
        while !self.garage.is_empty() || !self.running.is_empty() {
            self.tick()?;
        }
        log_main!(
            EVENT_RUN_DONE,
            "All vehicles scheduled",
            session = session.as_str(),
            ticks = self.current_time,
            arrived = self.arrived.len() as u64,
            unroutable = self.unroutable.len() as u64
        );
        Ok(())
    }

    /// Executes one time unit: resolve running vehicles, check invariants,
    /// admit garaged vehicles, advance the clock.
    pub fn tick(&mut self) -> Result<(), SchedulerError> {
        log_detailed!(
            EVENT_TICK,
            "Tick begin",
            time = self.current_time,
            running = self.running.len() as u64,
            garaged = self.garage.len() as u64
        );
        self.mark_pending();
        self.resolve_running()?;
        self.refresh_dirty_roads();
        self.admit_vehicles()?;
        self.refresh_dirty_roads();
        self.check_invariants()?;
        self.current_time += 1;
        Ok(())
    }

    /// Re-marks every on-network vehicle as pending and drops last tick's
    /// turn decisions.
    fn mark_pending(&mut self) {
        for car in &self.running {
            if let Some(vehicle) = self.vehicles.get_mut(car) {
                vehicle.phase = VehiclePhase::Pending;
                vehicle.clear_turn_plan();
            }
        }
    }

    /// Computes the ideal path of a vehicle from its current position under
    /// the current weights.
    ///
    /// # Returns
    /// `false` when the destination is unreachable.
    pub(crate) fn plan_ideal(&mut self, car: CarID) -> bool {
        let (from, dest, planned) = match self.vehicles.get(&car) {
            Some(vehicle) => (
                vehicle.at_cross,
                vehicle.dest_cross,
                vehicle.planned_departure,
            ),
            None => return false,
        };
        match shortest_path(&self.net, from, dest) {
            Ok(path) => {
                let cost = path.cost();
                let vertices = path.vertices().to_vec();
                if let Some(vehicle) = self.vehicles.get_mut(&car) {
                    vehicle.planned_path = vertices;
                    vehicle.ideal_time = cost;
                    vehicle.ideal_arrival = planned.max(self.current_time) as f64 + cost;
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Plans the ideal path of every garaged vehicle and arranges the pool
    /// by ideal arrival time. Unreachable trips are set aside.
    fn arrange_garage(&mut self) {
        let pool: Vec<CarID> = self.garage.clone();
        let mut routable: Vec<(f64, CarID)> = Vec::new();
        for car in pool {
            if self.plan_ideal(car) {
                let arrival = self
                    .vehicles
                    .get(&car)
                    .map(|vehicle| vehicle.ideal_arrival)
                    .unwrap_or(f64::INFINITY);
                routable.push((arrival, car));
            } else {
                self.unroutable.push(car);
                tracing::warn!(
                    event = EVENT_UNROUTABLE,
                    car = car,
                    "No route from origin to destination; vehicle will never depart"
                );
            }
        }
        routable.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        self.garage = routable.into_iter().map(|(_, car)| car).collect();
    }

    /// Plans the next turn of a running vehicle standing before a crossing:
    /// the first enumerated path that does not double back, classified
    /// against the current incoming road.
    pub(crate) fn plan_next_move(&mut self, car: CarID) {
        let (at, dest, last, in_road) = match self.vehicles.get(&car) {
            Some(vehicle) => (
                vehicle.at_cross,
                vehicle.dest_cross,
                vehicle.last_traversed_cross(),
                vehicle.on_road,
            ),
            None => return,
        };
        let Some(in_road) = in_road else {
            return;
        };
        let Some(crossing) = self.crosses.get(&at) else {
            return;
        };
        for path in k_shortest_paths(
            &self.net,
            at,
            dest,
            self.config.path_enum_max,
            self.config.path_probe_max,
        ) {
            let vertices = path.vertices();
            if vertices.len() < 2 {
                return;
            }
            if last == Some(vertices[1]) {
                continue;
            }
            let Some(next_road) = self.net.road_between(vertices[0], vertices[1]) else {
                continue;
            };
            let Some(intent) = crossing.classify(in_road.base, next_road.base) else {
                continue;
            };
            let cost = path.cost();
            let vertices = vertices.to_vec();
            if let Some(vehicle) = self.vehicles.get_mut(&car) {
                vehicle.planned_path = vertices;
                vehicle.ideal_time = cost;
                vehicle.set_turn_plan(intent, next_road);
            }
            log_detailed!(
                EVENT_PLAN_ROUTE,
                "Turn planned",
                car = car,
                next_base = next_road.base
            );
            return;
        }
    }

    /// Removes a vehicle from the grid and records its arrival.
    pub(crate) fn arrive(&mut self, car: CarID) -> Result<(), SchedulerError> {
        let (road_id, lane_idx, cell) = match self.vehicles.get(&car) {
            Some(vehicle) => match vehicle.on_road {
                Some(road) => (road, vehicle.on_lane, vehicle.on_cell),
                None => return Err(InvariantError::MissingVehicle { car }.into()),
            },
            None => return Err(InvariantError::MissingVehicle { car }.into()),
        };
        let road = self
            .roads
            .get_mut(&road_id)
            .ok_or(InvariantError::UnknownRoad { road: road_id })?;
        let removed = road.lane_mut(lane_idx).vacate(cell);
        if removed != Some(car) {
            return Err(InvariantError::CellMismatch {
                car,
                road: road_id,
                lane: lane_idx,
                cell,
            }
            .into());
        }
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.phase = VehiclePhase::Arrived;
            vehicle.on_road = None;
        }
        self.running.retain(|id| *id != car);
        self.arrived.push(car);
        self.refresh_road_weight(road_id);
        log_additional!(
            EVENT_ARRIVAL,
            "Vehicle arrived",
            car = car,
            time = self.current_time
        );
        Ok(())
    }

    /// Moves a vehicle from its recorded cell to the given one; both cells
    /// must agree with the bookkeeping.
    pub(crate) fn move_vehicle_cell(
        &mut self,
        car: CarID,
        dest_road: RoadID,
        dest_lane: usize,
        dest_cell: usize,
    ) -> Result<(), SchedulerError> {
        let (src_road, src_lane, src_cell) = match self.vehicles.get(&car) {
            Some(vehicle) => match vehicle.on_road {
                Some(road) => (road, vehicle.on_lane, vehicle.on_cell),
                None => return Err(InvariantError::MissingVehicle { car }.into()),
            },
            None => return Err(InvariantError::MissingVehicle { car }.into()),
        };
        {
            let road = self
                .roads
                .get_mut(&src_road)
                .ok_or(InvariantError::UnknownRoad { road: src_road })?;
            let removed = road.lane_mut(src_lane).vacate(src_cell);
            if removed != Some(car) {
                return Err(InvariantError::CellMismatch {
                    car,
                    road: src_road,
                    lane: src_lane,
                    cell: src_cell,
                }
                .into());
            }
        }
        {
            let road = self
                .roads
                .get_mut(&dest_road)
                .ok_or(InvariantError::UnknownRoad { road: dest_road })?;
            if !road.lane_mut(dest_lane).occupy(dest_cell, car) {
                return Err(InvariantError::CellCollision {
                    car,
                    road: dest_road,
                    lane: dest_lane,
                    cell: dest_cell,
                }
                .into());
            }
        }
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.on_road = Some(dest_road);
            vehicle.on_lane = dest_lane;
            vehicle.on_cell = dest_cell;
        }
        self.dirty_roads.insert(src_road);
        self.dirty_roads.insert(dest_road);
        Ok(())
    }

    /// Parks a vehicle at the head cell of its current lane, keeping its
    /// speed, and settles it for this tick.
    pub(crate) fn park_at_head(&mut self, car: CarID) -> Result<(), SchedulerError> {
        let (road, lane, cell) = match self.vehicles.get(&car) {
            Some(vehicle) => match vehicle.on_road {
                Some(road) => (road, vehicle.on_lane, vehicle.on_cell),
                None => return Err(InvariantError::MissingVehicle { car }.into()),
            },
            None => return Err(InvariantError::MissingVehicle { car }.into()),
        };
        if cell != 0 {
            self.move_vehicle_cell(car, road, lane, 0)?;
        }
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.phase = VehiclePhase::Settled;
        }
        Ok(())
    }

    /// The canonical road visit order: crossings ascending by id, then each
    /// crossing's incoming roads ascending by base id.
    pub(crate) fn scan_order(&self) -> Vec<RoadID> {
        self.crosses
            .values()
            .flat_map(|crossing| crossing.incoming().iter().copied())
            .collect()
    }

    /// Returns the road's crossing candidate as `(cell, lane, id)`: its
    /// head-most lane-head vehicle still waiting, lowest cell first, ties
    /// broken by lane index.
    pub(crate) fn waiting_head_vehicle(&self, road_id: RoadID) -> Option<(usize, usize, CarID)> {
        let road = self.roads.get(&road_id)?;
        let mut best: Option<(usize, usize, CarID)> = None;
        for (lane_idx, lane) in road.lanes().iter().enumerate() {
            if let Some((pos, car)) = lane.head_vehicle() {
                let waiting = self
                    .vehicles
                    .get(&car)
                    .map(|vehicle| vehicle.phase == VehiclePhase::Waiting)
                    .unwrap_or(false);
                if waiting && best.map_or(true, |(best_pos, _, _)| pos < best_pos) {
                    best = Some((pos, lane_idx, car));
                }
            }
        }
        best
    }

    /// Number of on-network vehicles not yet settled this tick.
    pub(crate) fn count_unsettled(&self) -> usize {
        self.running
            .iter()
            .filter(|car| {
                self.vehicles
                    .get(*car)
                    .map(|vehicle| vehicle.phase != VehiclePhase::Settled)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Sum of every road's entry capacity.
    pub(crate) fn network_entry_capacity(&self) -> i64 {
        self.roads.values().map(|road| road.entry_capacity()).sum()
    }

    /// Recomputes one road's edge weight from its current entry conditions.
    pub(crate) fn refresh_road_weight(&mut self, road_id: RoadID) {
        if let Some(road) = self.roads.get(&road_id) {
            let weight = self.net.refresh_weight(road, &self.vehicles);
            log_all!(
                EVENT_WEIGHT_UPDATE,
                "Edge weight refreshed",
                road_base = road_id.base,
                road_direction = road_id.direction as u64,
                weight = weight
            );
        }
    }

    /// Refreshes the weights of every road whose occupancy changed since the
    /// last sweep.
    pub(crate) fn refresh_dirty_roads(&mut self) {
        let dirty: Vec<RoadID> = self.dirty_roads.drain(..).collect();
        for road_id in dirty {
            self.refresh_road_weight(road_id);
        }
    }

    /// Admits due garaged vehicles ascending by id while the network stays
    /// above the block cap and under the on-road soft cap.
    fn admit_vehicles(&mut self) -> Result<(), SchedulerError> {
        let mut eligible: Vec<CarID> = self
            .garage
            .iter()
            .copied()
            .filter(|car| {
                self.vehicles
                    .get(car)
                    .map(|vehicle| vehicle.planned_departure <= self.current_time)
                    .unwrap_or(false)
            })
            .collect();
        eligible.sort_unstable();
        if eligible.is_empty() {
            log_detailed!(
                EVENT_ADMISSION,
                "No vehicle is due",
                time = self.current_time
            );
            return Ok(());
        }

        let mut admitted = 0u64;
        for car in eligible {
            let capacity = self.network_entry_capacity();
            if capacity <= self.block_capacity_total {
                log_main!(
                    EVENT_ADMISSION,
                    "Network capacity at the block cap; admission suspended",
                    time = self.current_time,
                    capacity = capacity,
                    block_capacity = self.block_capacity_total
                );
                break;
            }
            if self.running.len() >= self.config.on_road_soft_cap {
                log_detailed!(
                    EVENT_ADMISSION,
                    "On-road soft cap reached",
                    time = self.current_time,
                    running = self.running.len() as u64
                );
                break;
            }

            // Replan under the weights left by everything admitted so far.
            if !self.plan_ideal(car) {
                continue;
            }
            let (at, dest, max_speed, current_speed, ideal) = match self.vehicles.get(&car) {
                Some(vehicle) => (
                    vehicle.at_cross,
                    vehicle.dest_cross,
                    vehicle.max_speed,
                    vehicle.current_speed,
                    Path::new(vehicle.planned_path.clone(), vehicle.ideal_time),
                ),
                None => continue,
            };

            if at == dest {
                let now = self.current_time;
                if let Some(vehicle) = self.vehicles.get_mut(&car) {
                    vehicle.actual_departure = Some(now);
                    vehicle.phase = VehiclePhase::Arrived;
                }
                self.garage.retain(|id| *id != car);
                self.arrived.push(car);
                log_additional!(
                    EVENT_ARRIVAL,
                    "Trivial trip arrived on departure",
                    car = car,
                    time = now
                );
                continue;
            }

            let picked = {
                let net = &self.net;
                let roads = &self.roads;
                let vehicles = &self.vehicles;
                let rng = &mut self.rng;
                sample_first_road(
                    net,
                    at,
                    dest,
                    &ideal,
                    self.config.p_ideal,
                    self.config.path_enum_max,
                    self.config.path_probe_max,
                    |road| {
                        roads
                            .get(&road)
                            .map(|road| road.state(vehicles))
                            .unwrap_or(RoadState::Blocked)
                    },
                    rng,
                )
            };
            let Some(road_id) = picked else {
                log_detailed!(
                    EVENT_ADMISSION,
                    "No open departure road; vehicle deferred",
                    car = car,
                    time = self.current_time
                );
                continue;
            };

            let (state, lane_pick) = match self.roads.get(&road_id) {
                Some(road) => (road.state(&self.vehicles), road.pick_admittable_lane()),
                None => continue,
            };
            if state != RoadState::DriveIn {
                continue;
            }
            let Some(lane_idx) = lane_pick else {
                continue;
            };

            let (length, road_speed, from_cross, to_cross) = {
                let road = &self.roads[&road_id];
                (
                    road.get_length(),
                    road.get_speed_limit(),
                    road.get_from_cross(),
                    road.get_to_cross(),
                )
            };
            let admit_speed = current_speed.min(road_speed).min(max_speed);
            let (entry_run, entry_cell, queue_speed) = {
                let lane = self.roads[&road_id].lane(lane_idx);
                let entry_cell = lane.entry_cell();
                (
                    lane.entry_run() as i64,
                    entry_cell,
                    lane.leader_speed(entry_cell, &self.vehicles).min(max_speed),
                )
            };
            let (cell, speed) = if entry_run > admit_speed {
                ((length - admit_speed) as usize, admit_speed)
            } else {
                (entry_cell, queue_speed)
            };

            {
                let road = self
                    .roads
                    .get_mut(&road_id)
                    .ok_or(InvariantError::UnknownRoad { road: road_id })?;
                if !road.lane_mut(lane_idx).occupy(cell, car) {
                    return Err(InvariantError::CellCollision {
                        car,
                        road: road_id,
                        lane: lane_idx,
                        cell,
                    }
                    .into());
                }
            }
            let now = self.current_time;
            if let Some(vehicle) = self.vehicles.get_mut(&car) {
                vehicle.on_road = Some(road_id);
                vehicle.on_lane = lane_idx;
                vehicle.on_cell = cell;
                vehicle.current_speed = speed;
                vehicle.actual_departure = Some(now);
                vehicle.phase = VehiclePhase::Settled;
                vehicle.record_traversal(road_id, from_cross, to_cross);
            }
            self.garage.retain(|id| *id != car);
            self.running.push(car);
            self.refresh_road_weight(road_id);
            admitted += 1;
            log_additional!(
                EVENT_ADMIT_VEHICLE,
                "Vehicle departs",
                car = car,
                time = now,
                road_base = road_id.base,
                road_direction = road_id.direction as u64,
                cell = cell as u64
            );
        }

        if admitted > 0 {
            log_main!(
                EVENT_ADMISSION,
                "Admission done",
                time = self.current_time,
                admitted = admitted
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;
    use crate::utils::fixtures::{one_road_entities, plus_network_entities};

    #[test]
    fn test_topology_unknown_road_endpoint() {
        let (crosses, mut roads, cars) = one_road_entities();
        roads[0] = Road::new(roads[0].get_id())
            .with_length(3)
            .with_speed_limit(2)
            .with_lane_count(2)
            .with_endpoints(1, 99)
            .build();
        let err = Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap_err();
        assert!(
            matches!(err, SchedulerError::UnknownRoadEndpoint { cross: 99, .. }),
            "Expected an unknown endpoint error, got {}",
            err
        );
    }

    #[test]
    fn test_topology_road_missing_from_slots() {
        let (mut crosses, roads, cars) = one_road_entities();
        crosses[1] = Crossing::new(2, [EMPTY_SLOT; 4]);
        let err = Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap_err();
        assert!(
            matches!(err, SchedulerError::RoadNotConnected { cross: 2, .. }),
            "Expected a road-not-connected error, got {}",
            err
        );
    }

    #[test]
    fn test_topology_unknown_trip_cross() {
        let (crosses, roads, mut cars) = one_road_entities();
        cars[0] = Vehicle::new(1)
            .with_origin(1)
            .with_destination(42)
            .with_max_speed(2)
            .with_planned_departure(0)
            .build();
        let err = Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap_err();
        assert!(
            matches!(err, SchedulerError::UnknownTripCross { car: 1, cross: 42 }),
            "Expected an unknown trip crossing error, got {}",
            err
        );
    }

    #[test]
    fn test_unroutable_vehicle_is_set_aside() {
        // The single road runs 1 -> 2; a 2 -> 1 trip has no route.
        let (crosses, roads, mut cars) = one_road_entities();
        cars.push(
            Vehicle::new(9)
                .with_origin(2)
                .with_destination(1)
                .with_max_speed(2)
                .with_planned_departure(0)
                .build(),
        );
        let mut scheduler =
            Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap();
        assert_eq!(&[9], scheduler.unroutable(), "The reverse trip must be set aside");
        scheduler.run().unwrap();
        assert_eq!(
            None,
            scheduler.vehicle(9).unwrap().actual_departure,
            "An unroutable vehicle never departs"
        );
    }

    #[test]
    fn test_admission_soft_cap_defers_second_vehicle() {
        let (crosses, roads, mut cars) = one_road_entities();
        cars.push(
            Vehicle::new(2)
                .with_origin(1)
                .with_destination(2)
                .with_max_speed(2)
                .with_planned_departure(0)
                .build(),
        );
        let config = SchedulerConfig::default()
            .with_capacity_threshold(0.0)
            .with_on_road_soft_cap(1);
        let mut scheduler = Scheduler::new(crosses, roads, cars, config).unwrap();
        scheduler.tick().unwrap();
        assert_eq!(
            Some(0),
            scheduler.vehicle(1).unwrap().actual_departure,
            "The first vehicle departs at time 0"
        );
        assert_eq!(
            None,
            scheduler.vehicle(2).unwrap().actual_departure,
            "The soft cap must defer the second vehicle"
        );
        scheduler.run().unwrap();
        assert!(
            scheduler.vehicle(2).unwrap().actual_departure.unwrap() > 0,
            "The second vehicle departs only after the first leaves the road"
        );
    }

    #[test]
    fn test_trivial_trip_arrives_on_departure() {
        let (crosses, roads, mut cars) = one_road_entities();
        cars[0] = Vehicle::new(1)
            .with_origin(1)
            .with_destination(1)
            .with_max_speed(2)
            .with_planned_departure(4)
            .build();
        let mut scheduler =
            Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap();
        scheduler.run().unwrap();
        let vehicle = scheduler.vehicle(1).unwrap();
        assert_eq!(Some(4), vehicle.actual_departure, "Departure waits for the planned time");
        assert!(vehicle.traversed_roads.is_empty(), "A trivial trip uses no roads");
        assert_eq!(VehiclePhase::Arrived, vehicle.phase);
    }

    #[test]
    fn test_deterministic_departures_per_seed() {
        let collect = |seed: u64| -> Vec<(CarID, Option<i64>, usize)> {
            let (crosses, roads, cars) = plus_network_entities(8);
            let config = SchedulerConfig::default().with_rng_seed(seed);
            let mut scheduler = Scheduler::new(crosses, roads, cars, config).unwrap();
            scheduler.run().unwrap();
            scheduler
                .vehicles()
                .values()
                .map(|v| (v.id, v.actual_departure, v.traversed_roads.len()))
                .collect()
        };
        assert_eq!(
            collect(11),
            collect(11),
            "Identical seeds must reproduce identical schedules"
        );
    }
}
