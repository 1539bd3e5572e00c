use crate::agents::vehicle::CarID;
use crate::agents::vehicles_storage::VehiclesStorage;

/// Represents a single lane of a directed road.
///
/// A lane is a fixed-length array of cells. Cell index 0 is the head of the
/// lane (adjacent to the downstream crossing); the highest index is the tail,
/// where vehicles enter from upstream. Each cell is either empty or holds the
/// identifier of exactly one vehicle.
#[derive(Debug, Clone)]
pub struct Lane {
    /// Unique identifier of the lane, e.g. `"12#1@1"`.
    id: String,
    /// The speed limit for vehicles moving along the lane (cells per time unit).
    speed_limit: i64,
    /// Occupancy slots. Index 0 is the head cell.
    cells: Vec<Option<CarID>>,
}

impl Lane {
    /// Creates a new empty lane.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the lane.
    /// * `length` - Number of cells in the lane.
    /// * `speed_limit` - The speed limit (in cells per time unit).
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::network::lane::Lane;
    /// let lane = Lane::new("7#1@1", 5, 3);
    /// assert_eq!(lane.len(), 5);
    /// assert_eq!(lane.free_count(), 5);
    /// ```
    pub fn new(id: impl Into<String>, length: usize, speed_limit: i64) -> Self {
        Lane {
            id: id.into(),
            speed_limit,
            cells: vec![None; length],
        }
    }

    /// Returns the unique identifier of the lane.
    pub fn get_id(&self) -> &str {
        &self.id
    }

    /// Returns the number of cells in the lane.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the lane has zero cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the speed limit of the lane (cells per time unit).
    pub fn get_speed_limit(&self) -> i64 {
        self.speed_limit
    }

    /// Returns the occupant of the cell at `pos`, if any.
    pub fn cell(&self, pos: usize) -> Option<CarID> {
        self.cells.get(pos).copied().flatten()
    }

    /// Writes `car` into the cell at `pos`. The cell must be empty.
    ///
    /// # Returns
    /// `false` when the target cell already holds another vehicle (the caller
    /// treats this as a fatal occupancy violation).
    pub fn occupy(&mut self, pos: usize, car: CarID) -> bool {
        match self.cells.get_mut(pos) {
            Some(slot) if slot.is_none() => {
                *slot = Some(car);
                true
            }
            _ => false,
        }
    }

    /// Clears the cell at `pos` and returns its previous occupant.
    pub fn vacate(&mut self, pos: usize) -> Option<CarID> {
        self.cells.get_mut(pos).and_then(|slot| slot.take())
    }

    /// Returns the number of contiguous empty cells at the tail end of the
    /// lane — the only region an entering vehicle can legally occupy.
    /// Equals `len()` when the lane is empty.
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::network::lane::Lane;
    /// let mut lane = Lane::new("1#1@1", 5, 3);
    /// assert_eq!(lane.entry_run(), 5);
    /// lane.occupy(2, 10);
    /// assert_eq!(lane.entry_run(), 2); // cells 3 and 4
    /// ```
    pub fn entry_run(&self) -> usize {
        self.cells
            .iter()
            .rev()
            .take_while(|slot| slot.is_none())
            .count()
    }

    /// Returns the cell index where a follower-entering vehicle parks: the
    /// slot just tailward of the tail-most occupant, or 0 when the lane is
    /// empty.
    pub fn entry_cell(&self) -> usize {
        self.cells.len() - self.entry_run()
    }

    /// Returns the index of the next occupied cell toward the head, strictly
    /// below `pos`, or `None` when the run to the head is clear.
    pub fn leader_of(&self, pos: usize) -> Option<usize> {
        self.cells[..pos.min(self.cells.len())]
            .iter()
            .rposition(|slot| slot.is_some())
    }

    /// Returns the index of the next occupied cell toward the tail, strictly
    /// above `pos`, or `None` when no vehicle follows.
    pub fn follower_of(&self, pos: usize) -> Option<usize> {
        if pos + 1 >= self.cells.len() {
            return None;
        }
        self.cells[pos + 1..]
            .iter()
            .position(|slot| slot.is_some())
            .map(|offset| pos + 1 + offset)
    }

    /// Returns the total number of empty cells in the lane.
    pub fn free_count(&self) -> usize {
        self.cells.iter().filter(|slot| slot.is_none()).count()
    }

    /// Returns the current speed of the vehicle leading the cell at `pos`,
    /// or the lane speed limit when the run to the head is clear (open road).
    ///
    /// # Arguments
    /// * `pos` - The cell index to look ahead from.
    /// * `vehicles` - Storage resolving vehicle identifiers to their state.
    pub fn leader_speed(&self, pos: usize, vehicles: &VehiclesStorage) -> i64 {
        match self.leader_of(pos).and_then(|lead| self.cell(lead)) {
            Some(car) => vehicles
                .get(&car)
                .map(|v| v.current_speed)
                .unwrap_or(self.speed_limit),
            None => self.speed_limit,
        }
    }

    /// Returns the tail-most vehicle on the lane, if any. This is the vehicle
    /// an entering follower would queue behind.
    pub fn tail_vehicle(&self) -> Option<CarID> {
        let entry = self.entry_cell();
        if entry == 0 {
            None
        } else {
            self.cells[entry - 1]
        }
    }

    /// Returns the head-most vehicle on the lane as `(cell index, id)`.
    pub fn head_vehicle(&self) -> Option<(usize, CarID)> {
        self.cells
            .iter()
            .enumerate()
            .find_map(|(pos, slot)| slot.map(|car| (pos, car)))
    }

    /// Iterates over occupied cells head-first as `(cell index, id)` pairs.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = (usize, CarID)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.map(|car| (pos, car)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;

    #[test]
    fn test_entry_run_and_entry_cell() {
        let mut lane = Lane::new("1#1@1", 6, 4);
        assert_eq!(6, lane.entry_run(), "Empty lane must expose its full length");
        assert_eq!(0, lane.entry_cell(), "Empty lane entry cell must be the head");

        assert!(lane.occupy(3, 100));
        assert_eq!(2, lane.entry_run(), "Entry run must stop at the tail-most occupant");
        assert_eq!(4, lane.entry_cell(), "Entry cell must sit just behind the occupant");

        assert!(lane.occupy(5, 200));
        assert_eq!(0, lane.entry_run(), "Occupied tail cell leaves no entry run");
        assert_eq!(6, lane.entry_cell(), "Full tail pushes the entry cell out of range");
    }

    #[test]
    fn test_neighbor_queries() {
        let mut lane = Lane::new("1#1@1", 6, 4);
        lane.occupy(1, 100);
        lane.occupy(4, 200);

        assert_eq!(Some(1), lane.leader_of(4), "Leader of cell 4 must be cell 1");
        assert_eq!(None, lane.leader_of(1), "Head-most vehicle has no leader");
        assert_eq!(Some(4), lane.follower_of(1), "Follower of cell 1 must be cell 4");
        assert_eq!(None, lane.follower_of(4), "Tail-most vehicle has no follower");
        assert_eq!(4, lane.free_count(), "Two occupants on six cells leave four free");
    }

    #[test]
    fn test_leader_speed_open_road_and_follower() {
        let mut vehicles = VehiclesStorage::new();
        vehicles.insert_vehicle({
            let mut v = Vehicle::new(100).with_max_speed(5).build();
            v.current_speed = 2;
            v
        });

        let mut lane = Lane::new("1#1@1", 6, 4);
        assert_eq!(
            4,
            lane.leader_speed(5, &vehicles),
            "Open road must yield the lane speed limit"
        );
        lane.occupy(1, 100);
        assert_eq!(
            2,
            lane.leader_speed(4, &vehicles),
            "Leader speed must come from the leading vehicle"
        );
    }

    #[test]
    fn test_occupy_rejects_collision() {
        let mut lane = Lane::new("1#1@1", 3, 2);
        assert!(lane.occupy(1, 100));
        assert!(!lane.occupy(1, 200), "Occupying a held cell must be rejected");
        assert_eq!(Some(100), lane.vacate(1));
        assert_eq!(None, lane.vacate(1), "Vacating an empty cell yields nothing");
    }

    #[test]
    fn test_head_and_tail_vehicle() {
        let mut lane = Lane::new("1#1@1", 6, 4);
        assert_eq!(None, lane.head_vehicle());
        assert_eq!(None, lane.tail_vehicle());
        lane.occupy(2, 100);
        lane.occupy(4, 200);
        assert_eq!(Some((2, 100)), lane.head_vehicle(), "Head vehicle is the lowest occupied cell");
        assert_eq!(Some(200), lane.tail_vehicle(), "Tail vehicle is the highest occupied cell");
    }
}
