use crate::network::road::{Road, RoadID};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

pub type CrossID = i64; // Alias for CrossID

/// Index of the connector slot holding no road.
pub const EMPTY_SLOT: i64 = -1;

/// Turn classification of a (incoming road, outgoing road) pair at a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Straight,
    Right,
}

impl fmt::Display for TurnDirection {
    /// Formats the turn direction for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use traffic_sched_core::network::crossing::TurnDirection;
    ///
    /// assert_eq!(format!("{}", TurnDirection::Left), "left");
    /// assert_eq!(format!("{}", TurnDirection::Straight), "straight");
    /// assert_eq!(format!("{}", TurnDirection::Right), "right");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Left => write!(f, "left"),
            TurnDirection::Straight => write!(f, "straight"),
            TurnDirection::Right => write!(f, "right"),
        }
    }
}

/// The three competing arms of an incoming road at a crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetingArms {
    /// Base road id of the arm a left turn exits through, if present.
    pub left: Option<i64>,
    /// Base road id of the facing arm, if present.
    pub opposite: Option<i64>,
    /// Base road id of the arm a right turn exits through, if present.
    pub right: Option<i64>,
}

/// Represents a crossing with four connector slots.
///
/// The slots keep the rotational order of the input record; that order is
/// meaningful, since the angular offset between two slots classifies the turn
/// between their roads: +1 is a left turn, +2 straight, +3 a right turn.
#[derive(Debug, Clone)]
pub struct Crossing {
    /// Unique identifier of the crossing.
    id: CrossID,
    /// Base road ids of the four connectors in rotational order; [`EMPTY_SLOT`] marks a missing arm.
    slots: [i64; 4],
    /// Directed roads entering this crossing, ascending by base road id.
    incoming: Vec<RoadID>,
    /// Derived (incoming base, outgoing base) → turn classification.
    turn_table: HashMap<(i64, i64), TurnDirection>,
}

impl Crossing {
    /// Creates a new crossing and derives its turn classification table.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the crossing.
    /// * `slots` - The four connector base road ids in rotational order.
    ///
    /// # Example
    /// ```
    /// use traffic_sched_core::network::crossing::{Crossing, TurnDirection};
    /// let cross = Crossing::new(1, [10, 20, 30, 40]);
    /// assert_eq!(Some(TurnDirection::Left), cross.classify(10, 20));
    /// assert_eq!(Some(TurnDirection::Straight), cross.classify(10, 30));
    /// assert_eq!(Some(TurnDirection::Right), cross.classify(10, 40));
    /// ```
    pub fn new(id: CrossID, slots: [i64; 4]) -> Self {
        let mut turn_table = HashMap::new();
        for i in 0..4 {
            if slots[i] == EMPTY_SLOT {
                continue;
            }
            for (offset, direction) in [
                (1, TurnDirection::Left),
                (2, TurnDirection::Straight),
                (3, TurnDirection::Right),
            ] {
                let out = slots[(i + offset) % 4];
                if out != EMPTY_SLOT {
                    turn_table.insert((slots[i], out), direction);
                }
            }
        }
        Crossing {
            id,
            slots,
            incoming: Vec::new(),
            turn_table,
        }
    }

    /// Returns the unique identifier of the crossing.
    pub fn get_id(&self) -> CrossID {
        self.id
    }

    /// Returns the four connector slots in rotational order.
    pub fn get_slots(&self) -> &[i64; 4] {
        &self.slots
    }

    /// Classifies the turn from `in_base` onto `out_base`, or `None` when the
    /// pair does not meet at this crossing (including U-turns).
    pub fn classify(&self, in_base: i64, out_base: i64) -> Option<TurnDirection> {
        self.turn_table.get(&(in_base, out_base)).copied()
    }

    /// Resolves the directed roads entering this crossing.
    ///
    /// For every connector slot the directed road whose `to_cross` equals
    /// this crossing is recorded; arms carrying only outbound traffic (the
    /// one-way case) contribute nothing. The result is kept ascending by base
    /// road id, which is the scheduling order.
    pub fn connect_incoming(&mut self, roads: &IndexMap<RoadID, Road>) {
        let mut bases: Vec<i64> = self
            .slots
            .iter()
            .copied()
            .filter(|base| *base != EMPTY_SLOT)
            .collect();
        bases.sort_unstable();

        self.incoming.clear();
        for base in bases {
            for direction in 1..=2u8 {
                let id = RoadID::new(base, direction);
                if let Some(road) = roads.get(&id) {
                    if road.get_to_cross() == self.id {
                        self.incoming.push(id);
                        break;
                    }
                }
            }
        }
    }

    /// Returns the directed roads entering this crossing, ascending by base id.
    pub fn incoming(&self) -> &[RoadID] {
        &self.incoming
    }

    /// Returns the incoming directed road on the arm with the given base id.
    pub fn incoming_from_base(&self, base: i64) -> Option<RoadID> {
        self.incoming.iter().copied().find(|id| id.base == base)
    }

    /// Returns the competing arms of an incoming road, or `None` when the
    /// road is not connected here.
    ///
    /// The angular offsets match the turn table: the arm a left turn exits
    /// through (+1) is the left arm, +2 faces the incoming road, +3 is the
    /// right arm.
    pub fn competing_arms(&self, in_base: i64) -> Option<CompetingArms> {
        let i = self.slots.iter().position(|slot| *slot == in_base)?;
        let arm = |offset: usize| {
            let base = self.slots[(i + offset) % 4];
            (base != EMPTY_SLOT).then_some(base)
        };
        Some(CompetingArms {
            left: arm(1),
            opposite: arm(2),
            right: arm(3),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_classification_rotation() {
        let cross = Crossing::new(1, [10, 20, 30, 40]);
        // Each arm classifies against the other three by angular offset.
        for (in_base, left, straight, right) in [
            (10, 20, 30, 40),
            (20, 30, 40, 10),
            (30, 40, 10, 20),
            (40, 10, 20, 30),
        ] {
            assert_eq!(
                Some(TurnDirection::Left),
                cross.classify(in_base, left),
                "Offset +1 from {} must be a left turn",
                in_base
            );
            assert_eq!(
                Some(TurnDirection::Straight),
                cross.classify(in_base, straight),
                "Offset +2 from {} must be straight",
                in_base
            );
            assert_eq!(
                Some(TurnDirection::Right),
                cross.classify(in_base, right),
                "Offset +3 from {} must be a right turn",
                in_base
            );
        }
        assert_eq!(None, cross.classify(10, 10), "U-turns are not classified");

        // Arms agree with the turn table: left turns exit through the left arm.
        let arms = cross.competing_arms(10).unwrap();
        assert_eq!(Some(20), arms.left);
        assert_eq!(Some(30), arms.opposite);
        assert_eq!(Some(40), arms.right);
    }

    #[test]
    fn test_missing_slots_are_skipped() {
        let cross = Crossing::new(1, [10, EMPTY_SLOT, 30, EMPTY_SLOT]);
        assert_eq!(Some(TurnDirection::Straight), cross.classify(10, 30));
        assert_eq!(None, cross.classify(10, EMPTY_SLOT));
        let arms = cross.competing_arms(10).unwrap();
        assert_eq!(None, arms.left, "Empty slot must yield no left arm");
        assert_eq!(Some(30), arms.opposite);
        assert_eq!(None, arms.right, "Empty slot must yield no right arm");
    }

    #[test]
    fn test_connect_incoming_orders_by_base_id() {
        let mut roads = IndexMap::new();
        // Road 30 enters crossing 1; road 10 leaves it; road 20 is duplex.
        for (base, direction, from, to) in [(30, 1, 2, 1), (10, 1, 1, 3), (20, 1, 1, 4), (20, 2, 4, 1)] {
            let id = RoadID::new(base, direction);
            roads.insert(
                id,
                Road::new(id)
                    .with_length(3)
                    .with_speed_limit(1)
                    .with_lane_count(1)
                    .with_endpoints(from, to)
                    .build(),
            );
        }
        let mut cross = Crossing::new(1, [30, 10, 20, EMPTY_SLOT]);
        cross.connect_incoming(&roads);
        assert_eq!(
            vec![RoadID::new(20, 2), RoadID::new(30, 1)],
            cross.incoming().to_vec(),
            "Incoming roads must be the inbound directions, ascending by base id"
        );
        assert_eq!(Some(RoadID::new(20, 2)), cross.incoming_from_base(20));
        assert_eq!(None, cross.incoming_from_base(10), "Outbound-only arms have no incoming road");
    }
}
