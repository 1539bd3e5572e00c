use crate::agents::vehicle::VehiclePhase;
use crate::agents::vehicles_storage::VehiclesStorage;
use crate::network::crossing::CrossID;
use crate::network::lane::Lane;
use std::fmt;

/// Identifier of a directed road.
///
/// A bidirectional input road materializes as two directed roads sharing the
/// same base identifier: direction 1 runs `from → to` as given in the input,
/// direction 2 runs the reverse. The derived ordering sorts by base
/// identifier first and direction second, which is also the scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadID {
    /// The original (pre-split) integer road identifier.
    pub base: i64,
    /// Direction suffix: 1 for the input orientation, 2 for the reverse.
    pub direction: u8,
}

impl RoadID {
    /// Creates a directed road identifier.
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::network::road::RoadID;
    /// let forward = RoadID::new(7, 1);
    /// let reverse = RoadID::new(7, 2);
    /// assert!(forward < reverse);
    /// assert_eq!(format!("{}", reverse), "7#2");
    /// ```
    pub fn new(base: i64, direction: u8) -> Self {
        RoadID { base, direction }
    }
}

impl fmt::Display for RoadID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.base, self.direction)
    }
}

/// Admission-relevant state of a directed road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadState {
    /// Every lane is saturated behind a settled tail vehicle; nothing can enter.
    Blocked,
    /// Capacity is at or under the block threshold but some tail vehicle may still move.
    Waiting,
    /// Enough free capacity for vehicles to drive in.
    DriveIn,
}

impl fmt::Display for RoadState {
    /// Formats the road state for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_sched_core::network::road::RoadState;
    ///
    /// assert_eq!(format!("{}", RoadState::Blocked), "blocked");
    /// assert_eq!(format!("{}", RoadState::Waiting), "waiting");
    /// assert_eq!(format!("{}", RoadState::DriveIn), "drive_in");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadState::Blocked => write!(f, "blocked"),
            RoadState::Waiting => write!(f, "waiting"),
            RoadState::DriveIn => write!(f, "drive_in"),
        }
    }
}

/// Represents one directed road segment between two crossings.
///
/// A road owns `lane_count` parallel lanes of `length` cells each. Vehicles
/// enter at the lane tails (highest cell index) and exit toward `to_cross`
/// past the lane heads (cell index 0).
#[derive(Debug, Clone)]
pub struct Road {
    /// Directed identifier of the road.
    id: RoadID,
    /// Length of every lane, in cells.
    length: i64,
    /// Speed limit for all lanes (cells per time unit).
    speed_limit: i64,
    /// Number of parallel lanes.
    lane_count: usize,
    /// Upstream crossing (vehicles enter here).
    from_cross: CrossID,
    /// Downstream crossing (vehicles exit here).
    to_cross: CrossID,
    /// Entry capacity at or under which the road stops accepting vehicles.
    block_capacity: i64,
    /// Owned lanes, index 0 first for admission.
    lanes: Vec<Lane>,
}

impl Road {
    /// Constructs a new `RoadBuilder` for building a `Road` object.
    ///
    /// # Arguments
    /// * `id` - The directed identifier for the road.
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::network::road::{Road, RoadID};
    /// let road = Road::new(RoadID::new(7, 1))
    ///     .with_length(5)
    ///     .with_speed_limit(3)
    ///     .with_lane_count(2)
    ///     .with_endpoints(1, 2)
    ///     .build();
    /// assert_eq!(road.capacity(), 10);
    /// ```
    pub fn new(id: RoadID) -> RoadBuilder {
        RoadBuilder {
            road: Road {
                id,
                length: 1,
                speed_limit: 1,
                lane_count: 1,
                from_cross: -1,
                to_cross: -1,
                block_capacity: 0,
                lanes: Vec::new(),
            },
            block_threshold: 0.0,
        }
    }

    /// Returns the directed identifier of the road.
    pub fn get_id(&self) -> RoadID {
        self.id
    }

    /// Returns the length of the road in cells.
    pub fn get_length(&self) -> i64 {
        self.length
    }

    /// Returns the speed limit of the road (cells per time unit).
    pub fn get_speed_limit(&self) -> i64 {
        self.speed_limit
    }

    /// Returns the number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Returns the upstream crossing identifier.
    pub fn get_from_cross(&self) -> CrossID {
        self.from_cross
    }

    /// Returns the downstream crossing identifier.
    pub fn get_to_cross(&self) -> CrossID {
        self.to_cross
    }

    /// Returns the total cell capacity (`length × lane_count`).
    pub fn capacity(&self) -> i64 {
        self.length * self.lane_count as i64
    }

    /// Returns the entry capacity at or under which the road refuses vehicles.
    pub fn get_block_capacity(&self) -> i64 {
        self.block_capacity
    }

    /// Returns a reference to the lane at `index`.
    pub fn lane(&self, index: usize) -> &Lane {
        &self.lanes[index]
    }

    /// Returns a mutable reference to the lane at `index`.
    pub fn lane_mut(&mut self, index: usize) -> &mut Lane {
        &mut self.lanes[index]
    }

    /// Returns the owned lanes, index 0 first.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Returns the summed entry run over all lanes: the capacity reachable by
    /// entering vehicles.
    pub fn entry_capacity(&self) -> i64 {
        self.lanes.iter().map(|lane| lane.entry_run() as i64).sum()
    }

    /// Returns the total number of empty cells over all lanes.
    pub fn free_count(&self) -> usize {
        self.lanes.iter().map(|lane| lane.free_count()).sum()
    }

    /// Returns the index of the lowest lane an entering vehicle can drive
    /// into, or `None` when every lane's tail is occupied.
    pub fn pick_admittable_lane(&self) -> Option<usize> {
        self.lanes.iter().position(|lane| lane.entry_run() > 0)
    }

    /// Returns the speed an entering vehicle would be constrained to: the
    /// current speed of the tail-most vehicle on the first admittable lane,
    /// or the road speed limit when that lane is empty. `None` when no lane
    /// is admittable.
    pub fn entry_speed(&self, vehicles: &VehiclesStorage) -> Option<i64> {
        let lane = &self.lanes[self.pick_admittable_lane()?];
        match lane.tail_vehicle() {
            Some(car) => Some(
                vehicles
                    .get(&car)
                    .map(|v| v.current_speed)
                    .unwrap_or(self.speed_limit),
            ),
            None => Some(self.speed_limit),
        }
    }

    /// Computes the admission-relevant state of the road.
    ///
    /// `DriveIn` while the entry capacity exceeds the block capacity.
    /// Otherwise `Blocked` when every lane is non-empty with a settled
    /// tail-most vehicle, and `Waiting` while some tail vehicle may still be
    /// scheduled this tick.
    pub fn state(&self, vehicles: &VehiclesStorage) -> RoadState {
        if self.entry_capacity() > self.block_capacity {
            return RoadState::DriveIn;
        }
        let all_tails_settled = self.lanes.iter().all(|lane| {
            lane.tail_vehicle()
                .and_then(|car| vehicles.get(&car))
                .map(|v| v.phase == VehiclePhase::Settled)
                .unwrap_or(false)
        });
        if all_tails_settled {
            RoadState::Blocked
        } else {
            RoadState::Waiting
        }
    }
}

/// A builder pattern implementation for constructing `Road` objects.
pub struct RoadBuilder {
    road: Road,
    block_threshold: f64,
}

impl RoadBuilder {
    /// Sets the length of the road in cells.
    pub fn with_length(mut self, length: i64) -> Self {
        self.road.length = length;
        self
    }

    /// Sets the speed limit of the road (cells per time unit).
    pub fn with_speed_limit(mut self, speed_limit: i64) -> Self {
        self.road.speed_limit = speed_limit;
        self
    }

    /// Sets the number of parallel lanes.
    pub fn with_lane_count(mut self, lane_count: usize) -> Self {
        self.road.lane_count = lane_count;
        self
    }

    /// Sets the upstream and downstream crossing identifiers.
    pub fn with_endpoints(mut self, from_cross: CrossID, to_cross: CrossID) -> Self {
        self.road.from_cross = from_cross;
        self.road.to_cross = to_cross;
        self
    }

    /// Sets the fraction of the road capacity reserved as block capacity.
    pub fn with_block_threshold(mut self, threshold: f64) -> Self {
        self.block_threshold = threshold;
        self
    }

    /// Builds the final `Road` object, materializing its lanes.
    pub fn build(mut self) -> Road {
        self.road.block_capacity =
            (self.road.capacity() as f64 * self.block_threshold).floor() as i64;
        self.road.lanes = (1..=self.road.lane_count)
            .map(|n| {
                Lane::new(
                    format!("{}@{}", self.road.id, n),
                    self.road.length as usize,
                    self.road.speed_limit,
                )
            })
            .collect();
        self.road
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;

    fn two_lane_road() -> Road {
        Road::new(RoadID::new(1, 1))
            .with_length(4)
            .with_speed_limit(2)
            .with_lane_count(2)
            .with_endpoints(1, 2)
            .build()
    }

    #[test]
    fn test_road_id_ordering() {
        let mut ids = vec![RoadID::new(10, 1), RoadID::new(2, 2), RoadID::new(2, 1)];
        ids.sort();
        assert_eq!(
            vec![RoadID::new(2, 1), RoadID::new(2, 2), RoadID::new(10, 1)],
            ids,
            "Roads must sort by base identifier, then by direction"
        );
    }

    #[test]
    fn test_capacity_and_admittable_lane() {
        let mut road = two_lane_road();
        assert_eq!(8, road.capacity(), "Capacity must be length times lane count");
        assert_eq!(8, road.entry_capacity());
        assert_eq!(Some(0), road.pick_admittable_lane(), "First lane admits by default");

        // Saturate the first lane tail.
        road.lane_mut(0).occupy(3, 100);
        assert_eq!(Some(1), road.pick_admittable_lane(), "Second lane must take over");
        road.lane_mut(1).occupy(3, 200);
        assert_eq!(None, road.pick_admittable_lane(), "No lane admits with occupied tails");
    }

    #[test]
    fn test_entry_speed_follows_tail_vehicle() {
        let mut vehicles = VehiclesStorage::new();
        vehicles.insert_vehicle({
            let mut v = Vehicle::new(100).with_max_speed(5).build();
            v.current_speed = 1;
            v
        });

        let mut road = two_lane_road();
        assert_eq!(
            Some(2),
            road.entry_speed(&vehicles),
            "Empty admittable lane must yield the road speed limit"
        );
        road.lane_mut(0).occupy(2, 100);
        assert_eq!(
            Some(1),
            road.entry_speed(&vehicles),
            "Entry speed must come from the tail-most vehicle"
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut vehicles = VehiclesStorage::new();
        let mut settled = Vehicle::new(100).with_max_speed(2).build();
        settled.phase = VehiclePhase::Settled;
        vehicles.insert_vehicle(settled);
        let mut waiting = Vehicle::new(200).with_max_speed(2).build();
        waiting.phase = VehiclePhase::Waiting;
        vehicles.insert_vehicle(waiting);

        let mut road = Road::new(RoadID::new(1, 1))
            .with_length(1)
            .with_speed_limit(1)
            .with_lane_count(2)
            .with_endpoints(1, 2)
            .with_block_threshold(0.0)
            .build();
        assert_eq!(RoadState::DriveIn, road.state(&vehicles));

        road.lane_mut(0).occupy(0, 100);
        road.lane_mut(1).occupy(0, 200);
        assert_eq!(
            RoadState::Waiting,
            road.state(&vehicles),
            "An unsettled tail vehicle keeps the road waiting"
        );

        vehicles.get_mut(&200).unwrap().phase = VehiclePhase::Settled;
        assert_eq!(
            RoadState::Blocked,
            road.state(&vehicles),
            "All settled tail vehicles block the road"
        );
    }
}
