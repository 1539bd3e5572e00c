use crate::network::crossing::{CrossID, TurnDirection};
use crate::network::road::RoadID;
use std::fmt;

pub type CarID = i64; // Alias for CarID

/// Scheduling phase of a vehicle within one tick.
///
/// Only the scheduler transitions phases. `Garaged` vehicles wait for
/// admission; `Pending` marks on-network vehicles at the start of a tick;
/// `Waiting` vehicles cannot finish the tick without crossing an
/// intersection; `Settled` vehicles are done for the tick; `Arrived`
/// vehicles have left the network for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehiclePhase {
    /// Not yet admitted onto the network.
    Garaged,
    /// On the network, not yet scheduled this tick.
    Pending,
    /// Cannot resolve without passing a crossing this tick.
    Waiting,
    /// Scheduled for this tick.
    Settled,
    /// Reached its destination; never re-enters a lane.
    Arrived,
}

impl fmt::Display for VehiclePhase {
    /// Formats the vehicle phase for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_sched_core::agents::vehicle::VehiclePhase;
    ///
    /// assert_eq!(format!("{}", VehiclePhase::Garaged), "garaged");
    /// assert_eq!(format!("{}", VehiclePhase::Pending), "pending");
    /// assert_eq!(format!("{}", VehiclePhase::Waiting), "waiting");
    /// assert_eq!(format!("{}", VehiclePhase::Settled), "settled");
    /// assert_eq!(format!("{}", VehiclePhase::Arrived), "arrived");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehiclePhase::Garaged => write!(f, "garaged"),
            VehiclePhase::Pending => write!(f, "pending"),
            VehiclePhase::Waiting => write!(f, "waiting"),
            VehiclePhase::Settled => write!(f, "settled"),
            VehiclePhase::Arrived => write!(f, "arrived"),
        }
    }
}

/// Represents one car of the scheduling batch.
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Unique identifier
    pub id: CarID,
    /// Crossing the trip starts from
    pub origin_cross: CrossID,
    /// Crossing the trip ends at
    pub dest_cross: CrossID,
    /// Maximum speed which can be reached by the vehicle (cells per time unit).
    /// Effective speed on a lane is capped by the lane speed limit.
    pub max_speed: i64,
    /// Earliest time unit the vehicle may depart at
    pub planned_departure: i64,

    /// Current scheduling phase. See the ref. at `VehiclePhase`
    pub phase: VehiclePhase,
    /// Current speed (cells per time unit)
    pub current_speed: i64,
    /// Downstream crossing of the road the vehicle is on; the origin while garaged
    pub at_cross: CrossID,
    /// Directed road currently occupied, if on the network
    pub on_road: Option<RoadID>,
    /// Lane index within `on_road`
    pub on_lane: usize,
    /// Cell index within the lane (0 = head, nearest the downstream crossing)
    pub on_cell: usize,

    /// Time unit the vehicle actually departed at
    pub actual_departure: Option<i64>,
    /// Directed roads traversed so far, in order
    pub traversed_roads: Vec<RoadID>,
    /// Crossings passed so far, in order
    pub traversed_crosses: Vec<CrossID>,

    /// Ideal (shortest) path as crossing ids, recomputed on admission attempts
    pub planned_path: Vec<CrossID>,
    /// Cost of `planned_path` under the weights at computation time
    pub ideal_time: f64,
    /// `max(planned_departure, now) + ideal_time`; orders the garage pool
    pub ideal_arrival: f64,

    /// Turn classification toward the next crossing, once planned
    pub intent: Option<TurnDirection>,
    /// Directed road the vehicle wants to turn onto, once planned
    pub next_road: Option<RoadID>,
}

impl Vehicle {
    /// Constructs a new `VehicleBuilder` for building a `Vehicle` object.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the vehicle.
    ///
    /// # Returns
    /// A `VehicleBuilder` struct which is used to configure and build the `Vehicle` object.
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::agents::vehicle::Vehicle;
    /// let vehicle = Vehicle::new(1)
    ///     .with_origin(10)
    ///     .with_destination(20)
    ///     .with_max_speed(4)
    ///     .with_planned_departure(3)
    ///     .build();
    /// println!("Vehicle: {:?}", vehicle);
    /// ```
    pub fn new(id: CarID) -> VehicleBuilder {
        VehicleBuilder {
            vehicle: Vehicle {
                id,
                origin_cross: -1,
                dest_cross: -1,
                max_speed: 1,
                planned_departure: 0,
                phase: VehiclePhase::Garaged,
                current_speed: 1,
                at_cross: -1,
                on_road: None,
                on_lane: 0,
                on_cell: 0,
                actual_departure: None,
                traversed_roads: Vec::new(),
                traversed_crosses: Vec::new(),
                planned_path: Vec::new(),
                ideal_time: 0.0,
                ideal_arrival: 0.0,
                intent: None,
                next_road: None,
            },
        }
    }

    /// Returns the speed the vehicle can drive this tick on a lane with the
    /// given speed limit.
    pub fn effective_speed(&self, lane_speed_limit: i64) -> i64 {
        self.max_speed.min(lane_speed_limit)
    }

    /// Returns `true` while the vehicle occupies a cell somewhere on the network.
    pub fn is_on_network(&self) -> bool {
        matches!(
            self.phase,
            VehiclePhase::Pending | VehiclePhase::Waiting | VehiclePhase::Settled
        )
    }

    /// Returns the last crossing recorded in the traversal history.
    pub fn last_traversed_cross(&self) -> Option<CrossID> {
        self.traversed_crosses.last().copied()
    }

    /// Records the decided turn toward the next crossing.
    pub fn set_turn_plan(&mut self, intent: TurnDirection, next_road: RoadID) {
        self.intent = Some(intent);
        self.next_road = Some(next_road);
    }

    /// Drops any decided turn; called at the start of every tick.
    pub fn clear_turn_plan(&mut self) {
        self.intent = None;
        self.next_road = None;
    }

    /// Appends a traversed road to the history and moves the progress marker
    /// to its downstream crossing.
    pub fn record_traversal(&mut self, road: RoadID, from_cross: CrossID, to_cross: CrossID) {
        self.traversed_roads.push(road);
        self.traversed_crosses.push(from_cross);
        self.at_cross = to_cross;
    }
}

/// A builder pattern implementation for constructing `Vehicle` objects.
///
/// `VehicleBuilder` allows for optional configuration of `Vehicle` fields before building the final `Vehicle` object.
pub struct VehicleBuilder {
    vehicle: Vehicle,
}

impl VehicleBuilder {
    /// Sets the crossing the trip starts from.
    ///
    /// # Arguments
    /// * `cross` - The crossing identifier.
    ///
    /// # Returns
    /// A `VehicleBuilder` instance for further method chaining.
    pub fn with_origin(mut self, cross: CrossID) -> Self {
        self.vehicle.origin_cross = cross;
        self.vehicle.at_cross = cross;
        self
    }

    /// Sets the crossing the trip ends at.
    ///
    /// # Arguments
    /// * `cross` - The crossing identifier.
    ///
    /// # Returns
    /// A `VehicleBuilder` instance for further method chaining.
    pub fn with_destination(mut self, cross: CrossID) -> Self {
        self.vehicle.dest_cross = cross;
        self
    }

    /// Sets the maximum speed of the vehicle (cells per time unit). The
    /// current speed starts at the same value.
    ///
    /// # Arguments
    /// * `max_speed` - The maximum speed.
    ///
    /// # Returns
    /// A `VehicleBuilder` instance for further method chaining.
    pub fn with_max_speed(mut self, max_speed: i64) -> Self {
        self.vehicle.max_speed = max_speed;
        self.vehicle.current_speed = max_speed;
        self
    }

    /// Sets the earliest time unit the vehicle may depart at.
    ///
    /// # Arguments
    /// * `time` - The planned departure time.
    ///
    /// # Returns
    /// A `VehicleBuilder` instance for further method chaining.
    pub fn with_planned_departure(mut self, time: i64) -> Self {
        self.vehicle.planned_departure = time;
        self
    }

    /// Builds the final `Vehicle` object with the configured properties.
    ///
    /// # Returns
    /// The fully constructed `Vehicle` object.
    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let vehicle = Vehicle::new(1)
            .with_origin(10)
            .with_destination(20)
            .with_max_speed(4)
            .with_planned_departure(3)
            .build();
        assert_eq!(VehiclePhase::Garaged, vehicle.phase, "New vehicles start garaged");
        assert_eq!(4, vehicle.current_speed, "Current speed starts at the maximum");
        assert_eq!(10, vehicle.at_cross, "Progress marker starts at the origin");
        assert!(vehicle.traversed_roads.is_empty());
        assert!(!vehicle.is_on_network());
    }

    #[test]
    fn test_effective_speed_caps() {
        let vehicle = Vehicle::new(1).with_max_speed(4).build();
        assert_eq!(2, vehicle.effective_speed(2), "Lane limit caps the speed");
        assert_eq!(4, vehicle.effective_speed(6), "Vehicle maximum caps the speed");
    }

    #[test]
    fn test_record_traversal_moves_marker() {
        let mut vehicle = Vehicle::new(1).with_origin(10).with_destination(20).build();
        vehicle.record_traversal(RoadID::new(7, 2), 10, 15);
        assert_eq!(vec![RoadID::new(7, 2)], vehicle.traversed_roads);
        assert_eq!(vec![10], vehicle.traversed_crosses);
        assert_eq!(15, vehicle.at_cross, "Marker must follow the downstream crossing");
        assert_eq!(Some(10), vehicle.last_traversed_cross());
    }
}
