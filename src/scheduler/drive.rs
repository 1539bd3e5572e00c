use crate::agents::vehicle::{CarID, VehiclePhase};
use crate::network::road::RoadID;
use crate::scheduler::invariants::InvariantError;
use crate::scheduler::scheduler::{Scheduler, SchedulerError};
use crate::verbose::{EVENT_DRIVE_PASS, EVENT_STALL_RECOVERY};
use crate::{log_all, log_detailed};

impl Scheduler {
    /// Resolves every on-network vehicle for this tick.
    ///
    /// Alternates the drive fixed point with full crossing passes until
    /// everything is settled. A crossing pass always makes progress (each
    /// examined head vehicle crosses, yields or parks), so the loop
    /// terminates; the stall recovery exists as a guard for vehicles no pass
    /// can reach.
    pub(crate) fn resolve_running(&mut self) -> Result<(), SchedulerError> {
        if self.running.is_empty() {
            return Ok(());
        }
        loop {
            self.drive_to_fixed_point()?;
            if self.count_unsettled() == 0 {
                break;
            }
            let resolved = self.cross_full_pass()?;
            if resolved > 0 {
                continue;
            }
            let released = self.release_pinned()?;
            if released == 0 {
                self.settle_remaining_in_place();
                break;
            }
        }
        Ok(())
    }

    /// Repeats full head-first lane scans until a scan moves nothing.
    ///
    /// Each scan visits vehicles in (crossing id, incoming road id, lane
    /// index, cell index) order and settles those that can fully resolve
    /// without passing a crossing; the rest end up waiting.
    pub(crate) fn drive_to_fixed_point(&mut self) -> Result<(), SchedulerError> {
        let order = self.scan_order();
        let mut passes = 0u64;
        loop {
            let mut changed = false;
            for road_id in &order {
                let lane_count = match self.roads.get(road_id) {
                    Some(road) => road.lane_count(),
                    None => continue,
                };
                for lane_idx in 0..lane_count {
                    let cars: Vec<CarID> = self.roads[road_id]
                        .lane(lane_idx)
                        .iter_vehicles()
                        .map(|(_, car)| car)
                        .collect();
                    for car in cars {
                        changed |= self.drive_one(*road_id, car)?;
                    }
                }
            }
            passes += 1;
            if !changed {
                break;
            }
        }
        log_detailed!(
            EVENT_DRIVE_PASS,
            "Drive fixed point reached",
            time = self.current_time,
            passes = passes,
            unsettled = self.count_unsettled() as u64
        );
        Ok(())
    }

    /// Schedules one vehicle as far as its lane allows.
    ///
    /// # Returns
    /// `true` when the vehicle's position or phase changed.
    fn drive_one(&mut self, road_id: RoadID, car: CarID) -> Result<bool, SchedulerError> {
        let (phase, pos, lane_idx, max_speed, at, dest, has_intent) =
            match self.vehicles.get(&car) {
                Some(vehicle) => (
                    vehicle.phase,
                    vehicle.on_cell,
                    vehicle.on_lane,
                    vehicle.max_speed,
                    vehicle.at_cross,
                    vehicle.dest_cross,
                    vehicle.intent.is_some(),
                ),
                None => return Err(InvariantError::MissingVehicle { car }.into()),
            };
        match phase {
            VehiclePhase::Settled | VehiclePhase::Arrived => return Ok(false),
            VehiclePhase::Garaged => {
                return Err(InvariantError::StrayPhase { car, phase }.into());
            }
            VehiclePhase::Pending | VehiclePhase::Waiting => {}
        }

        let (speed, leader) = {
            let road = self
                .roads
                .get(&road_id)
                .ok_or(InvariantError::UnknownRoad { road: road_id })?;
            let lane = road.lane(lane_idx);
            let speed = max_speed.min(lane.get_speed_limit());
            let leader = lane.leader_of(pos).map(|lead_pos| (lead_pos, lane.cell(lead_pos)));
            (speed, leader)
        };

        match leader {
            None => {
                if pos as i64 >= speed {
                    // The whole move fits into this lane.
                    self.advance_within_lane(car, road_id, lane_idx, pos, speed as usize, speed)?;
                    Ok(true)
                } else if at == dest {
                    self.arrive(car)?;
                    Ok(true)
                } else {
                    if !has_intent {
                        self.plan_next_move(car);
                    }
                    self.set_waiting(car);
                    Ok(phase != VehiclePhase::Waiting)
                }
            }
            Some((lead_pos, occupant)) => {
                let lead_car = occupant.ok_or(InvariantError::CellMismatch {
                    car,
                    road: road_id,
                    lane: lane_idx,
                    cell: lead_pos,
                })?;
                let (lead_phase, lead_speed) = match self.vehicles.get(&lead_car) {
                    Some(leader) => (leader.phase, leader.current_speed),
                    None => return Err(InvariantError::MissingVehicle { car: lead_car }.into()),
                };
                match lead_phase {
                    VehiclePhase::Settled => {
                        let gap = (pos - lead_pos - 1) as i64;
                        if gap >= speed {
                            self.advance_within_lane(
                                car,
                                road_id,
                                lane_idx,
                                pos,
                                speed as usize,
                                speed,
                            )?;
                        } else {
                            let follow_speed = lead_speed.min(max_speed);
                            self.advance_within_lane(
                                car,
                                road_id,
                                lane_idx,
                                pos,
                                gap as usize,
                                follow_speed,
                            )?;
                        }
                        Ok(true)
                    }
                    VehiclePhase::Pending | VehiclePhase::Waiting => {
                        if !has_intent && (pos as i64) < speed {
                            self.plan_next_move(car);
                        }
                        self.set_waiting(car);
                        Ok(phase != VehiclePhase::Waiting)
                    }
                    VehiclePhase::Garaged | VehiclePhase::Arrived => {
                        Err(InvariantError::StrayPhase {
                            car: lead_car,
                            phase: lead_phase,
                        }
                        .into())
                    }
                }
            }
        }
    }

    fn set_waiting(&mut self, car: CarID) {
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.phase = VehiclePhase::Waiting;
        }
    }

    /// Moves a vehicle `distance` cells toward its lane head, assigns its
    /// speed and settles it.
    pub(crate) fn advance_within_lane(
        &mut self,
        car: CarID,
        road_id: RoadID,
        lane_idx: usize,
        pos: usize,
        distance: usize,
        new_speed: i64,
    ) -> Result<(), SchedulerError> {
        if distance > 0 {
            self.move_vehicle_cell(car, road_id, lane_idx, pos - distance)?;
        }
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.current_speed = new_speed;
            vehicle.phase = VehiclePhase::Settled;
        }
        // Speed changes alone shift the road's entry speed.
        self.dirty_roads.insert(road_id);
        log_all!(
            EVENT_DRIVE_PASS,
            "Vehicle advanced",
            car = car,
            road_base = road_id.base,
            cell = (pos - distance) as u64,
            speed = new_speed
        );
        Ok(())
    }

    /// Parks every waiting lane-head vehicle at cell 0 so its followers can
    /// be re-driven.
    ///
    /// # Returns
    /// The number of vehicles parked.
    fn release_pinned(&mut self) -> Result<usize, SchedulerError> {
        let mut released = 0usize;
        for road_id in self.scan_order() {
            let lane_count = match self.roads.get(&road_id) {
                Some(road) => road.lane_count(),
                None => continue,
            };
            for lane_idx in 0..lane_count {
                let head = self.roads[&road_id].lane(lane_idx).head_vehicle();
                if let Some((_, car)) = head {
                    let waiting = self
                        .vehicles
                        .get(&car)
                        .map(|vehicle| vehicle.phase == VehiclePhase::Waiting)
                        .unwrap_or(false);
                    if waiting {
                        self.park_at_head(car)?;
                        released += 1;
                        log_detailed!(
                            EVENT_STALL_RECOVERY,
                            "Pinned vehicle parked at its lane head",
                            car = car,
                            time = self.current_time
                        );
                    }
                }
            }
        }
        Ok(released)
    }

    /// Terminal guard: settles whatever is left where it stands.
    fn settle_remaining_in_place(&mut self) {
        for car in self.running.clone() {
            if let Some(vehicle) = self.vehicles.get_mut(&car) {
                if vehicle.phase != VehiclePhase::Settled {
                    vehicle.phase = VehiclePhase::Settled;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::agents::vehicle::{Vehicle, VehiclePhase};
    use crate::scheduler::config::SchedulerConfig;
    use crate::scheduler::scheduler::Scheduler;
    use crate::utils::fixtures::one_road_entities;

    #[test]
    fn test_single_car_crosses_short_road() {
        let (crosses, roads, cars) = one_road_entities();
        let mut scheduler =
            Scheduler::new(crosses, roads, cars, SchedulerConfig::default()).unwrap();

        // Tick 0: admitted at cell length - speed = 1.
        scheduler.tick().unwrap();
        let vehicle = scheduler.vehicle(1).unwrap();
        assert_eq!(Some(0), vehicle.actual_departure);
        assert_eq!(1, vehicle.on_cell, "Admission places at length - speed");
        assert_eq!(VehiclePhase::Settled, vehicle.phase);

        // Tick 1: one cell short of the crossing and the destination is there.
        scheduler.tick().unwrap();
        let vehicle = scheduler.vehicle(1).unwrap();
        assert_eq!(VehiclePhase::Arrived, vehicle.phase);
        assert_eq!(&[1], scheduler.arrived());
    }

    #[test]
    fn test_follower_adopts_leader_speed() {
        // A slow leader and a fast follower on a long single lane.
        let (crosses, roads, mut cars) = one_road_entities();
        cars[0] = Vehicle::new(1)
            .with_origin(1)
            .with_destination(2)
            .with_max_speed(1)
            .with_planned_departure(0)
            .build();
        cars.push(
            Vehicle::new(2)
                .with_origin(1)
                .with_destination(2)
                .with_max_speed(3)
                .with_planned_departure(0)
                .build(),
        );
        let roads = vec![
            crate::network::road::Road::new(roads[0].get_id())
                .with_length(10)
                .with_speed_limit(3)
                .with_lane_count(1)
                .with_endpoints(1, 2)
                .build(),
        ];
        let config = SchedulerConfig::default().with_capacity_threshold(0.0);
        let mut scheduler = Scheduler::new(crosses, roads, cars, config).unwrap();

        // Tick 0: car 1 takes the tail cell; the saturated lane defers car 2.
        scheduler.tick().unwrap();
        assert_eq!(9, scheduler.vehicle(1).unwrap().on_cell);
        assert_eq!(None, scheduler.vehicle(2).unwrap().actual_departure);

        // Tick 1: car 1 drives one cell; car 2 queues behind at its speed.
        scheduler.tick().unwrap();
        let leader = scheduler.vehicle(1).unwrap();
        let follower = scheduler.vehicle(2).unwrap();
        assert_eq!(8, leader.on_cell);
        assert_eq!(9, follower.on_cell, "Follower enters right behind the leader");
        assert_eq!(
            1, follower.current_speed,
            "Follower speed is capped by the slow leader"
        );

        // Tick 2: the follower keeps trailing one cell behind.
        scheduler.tick().unwrap();
        let leader = scheduler.vehicle(1).unwrap();
        let follower = scheduler.vehicle(2).unwrap();
        assert_eq!(
            leader.on_cell + 1,
            follower.on_cell,
            "Follower must sit right behind the leader"
        );
        assert_eq!(VehiclePhase::Settled, follower.phase);
        assert_eq!(1, follower.current_speed);
    }
}
