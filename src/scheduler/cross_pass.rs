use crate::agents::vehicle::CarID;
use crate::agents::vehicle::VehiclePhase;
use crate::network::crossing::{CrossID, TurnDirection};
use crate::network::road::RoadID;
use crate::scheduler::invariants::InvariantError;
use crate::scheduler::scheduler::{Scheduler, SchedulerError};
use crate::verbose::{EVENT_CROSS_PASS, EVENT_CROSS_STEP};
use crate::{log_additional, log_detailed};
use std::collections::HashMap;

impl Scheduler {
    /// One full crossing scan: crossings ascending by id, incoming roads
    /// ascending by base id, one candidate vehicle per road.
    ///
    /// Right-of-way is decided against the candidates captured at the start
    /// of the scan, so the outcome does not depend on the order in which
    /// roads release their vehicles. Every examined candidate makes
    /// progress: it crosses, or it parks settled at its lane head (yield,
    /// saturated destination, or insufficient carry-over) and retries next
    /// tick.
    ///
    /// # Returns
    /// The number of vehicles settled by this scan.
    pub(crate) fn cross_full_pass(&mut self) -> Result<usize, SchedulerError> {
        let snapshot = self.candidate_intents();
        let mut resolved = 0usize;
        let cross_ids: Vec<CrossID> = self.crosses.keys().copied().collect();
        for cross_id in cross_ids {
            let incoming: Vec<RoadID> = match self.crosses.get(&cross_id) {
                Some(crossing) => crossing.incoming().to_vec(),
                None => continue,
            };
            for road_id in incoming {
                let Some((pos, _lane_idx, car)) = self.waiting_head_vehicle(road_id) else {
                    continue;
                };
                let intent = self.vehicles.get(&car).and_then(|vehicle| vehicle.intent);
                let Some(intent) = intent else {
                    // No viable turn was found for it this tick.
                    self.park_at_head(car)?;
                    resolved += 1;
                    continue;
                };
                if self.must_yield(cross_id, road_id, intent, &snapshot) {
                    self.park_at_head(car)?;
                    resolved += 1;
                    log_detailed!(
                        EVENT_CROSS_STEP,
                        "Yielded right of way",
                        car = car,
                        cross = cross_id,
                        time = self.current_time
                    );
                    continue;
                }
                self.cross_step(cross_id, road_id, car, pos)?;
                resolved += 1;
            }
        }
        log_detailed!(
            EVENT_CROSS_PASS,
            "Cross pass done",
            time = self.current_time,
            resolved = resolved as u64
        );
        Ok(resolved)
    }

    /// Captures each road's crossing candidate and its intent before a scan.
    fn candidate_intents(&self) -> HashMap<RoadID, TurnDirection> {
        let mut snapshot = HashMap::new();
        for road_id in self.scan_order() {
            if let Some((_, _, car)) = self.waiting_head_vehicle(road_id) {
                if let Some(intent) = self.vehicles.get(&car).and_then(|vehicle| vehicle.intent) {
                    snapshot.insert(road_id, intent);
                }
            }
        }
        snapshot
    }

    /// Right-of-way between competing candidates at one crossing:
    /// straight traffic never yields, a left turn yields to straight traffic
    /// from its right arm, a right turn yields to straight traffic from its
    /// left arm and to left-turning traffic from the facing arm.
    fn must_yield(
        &self,
        cross_id: CrossID,
        in_road: RoadID,
        intent: TurnDirection,
        snapshot: &HashMap<RoadID, TurnDirection>,
    ) -> bool {
        let Some(crossing) = self.crosses.get(&cross_id) else {
            return false;
        };
        let Some(arms) = crossing.competing_arms(in_road.base) else {
            return false;
        };
        let arm_intent = |base: Option<i64>| -> Option<TurnDirection> {
            let road = crossing.incoming_from_base(base?)?;
            snapshot.get(&road).copied()
        };
        match intent {
            TurnDirection::Straight => false,
            TurnDirection::Left => arm_intent(arms.right) == Some(TurnDirection::Straight),
            TurnDirection::Right => {
                arm_intent(arms.left) == Some(TurnDirection::Straight)
                    || arm_intent(arms.opposite) == Some(TurnDirection::Left)
            }
        }
    }

    /// Moves a candidate over the crossing onto its planned road, or parks
    /// it at its lane head when the destination cannot take it this tick.
    fn cross_step(
        &mut self,
        cross_id: CrossID,
        in_road: RoadID,
        car: CarID,
        pos: usize,
    ) -> Result<(), SchedulerError> {
        let (max_speed, next_road_id) = match self.vehicles.get(&car) {
            Some(vehicle) => (vehicle.max_speed, vehicle.next_road),
            None => return Err(InvariantError::MissingVehicle { car }.into()),
        };
        let Some(next_id) = next_road_id else {
            self.park_at_head(car)?;
            return Ok(());
        };

        let (next_length, next_speed_limit, next_from, next_to, lane_pick) =
            match self.roads.get(&next_id) {
                Some(road) => (
                    road.get_length(),
                    road.get_speed_limit(),
                    road.get_from_cross(),
                    road.get_to_cross(),
                    road.pick_admittable_lane(),
                ),
                None => return Err(InvariantError::UnknownRoad { road: next_id }.into()),
            };
        let Some(dest_lane_idx) = lane_pick else {
            // Saturated destination: stop right before the crossing.
            self.park_at_head(car)?;
            log_detailed!(
                EVENT_CROSS_STEP,
                "Destination road saturated; parked at the crossing",
                car = car,
                cross = cross_id,
                time = self.current_time
            );
            return Ok(());
        };

        let crossing_speed = max_speed.min(next_speed_limit);
        let carry_over = crossing_speed - pos as i64;
        if carry_over <= 0 {
            self.park_at_head(car)?;
            return Ok(());
        }

        let (entry_run, entry_cell, queue_speed) = {
            let lane = self.roads[&next_id].lane(dest_lane_idx);
            let entry_cell = lane.entry_cell();
            (
                lane.entry_run() as i64,
                entry_cell,
                lane.leader_speed(entry_cell, &self.vehicles).min(max_speed),
            )
        };
        let (cell, speed) = if entry_run > carry_over {
            ((next_length - carry_over) as usize, crossing_speed)
        } else {
            (entry_cell, queue_speed)
        };

        self.move_vehicle_cell(car, next_id, dest_lane_idx, cell)?;
        if let Some(vehicle) = self.vehicles.get_mut(&car) {
            vehicle.current_speed = speed;
            vehicle.phase = VehiclePhase::Settled;
            vehicle.record_traversal(next_id, next_from, next_to);
        }
        self.refresh_road_weight(next_id);
        self.refresh_road_weight(in_road);
        log_additional!(
            EVENT_CROSS_STEP,
            "Crossed intersection",
            car = car,
            cross = cross_id,
            road_base = next_id.base,
            road_direction = next_id.direction as u64,
            cell = cell as u64,
            time = self.current_time
        );
        Ok(())
    }
}
