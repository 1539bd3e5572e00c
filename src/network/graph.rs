use crate::agents::vehicles_storage::VehiclesStorage;
use crate::network::crossing::CrossID;
use crate::network::road::{Road, RoadID};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;

/// Edge weight of a road no entering vehicle can currently use.
pub const BLOCKED_WEIGHT: f64 = 1000.0;

/// Custom error types for `RoadNetwork`.
#[derive(Debug, Clone)]
pub enum NetworkError {
    /// A road references a crossing that was never added to the network.
    UnknownCrossing { road: RoadID, cross: CrossID },
}

impl fmt::Display for NetworkError {
    /// Formats the error message for `NetworkError`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::UnknownCrossing { road, cross } => {
                write!(f, "Road '{}' references unknown crossing '{}'", road, cross)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

/// A directed edge of the road graph, one per directed road.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: CrossID,
    pub to: CrossID,
    /// Dynamic congestion weight, `length / entry_speed` or [`BLOCKED_WEIGHT`].
    pub weight: f64,
}

/// Directed weighted graph view over crossings and roads.
///
/// One vertex per crossing and one edge per directed road. Edge weights are
/// dynamic: the scheduler refreshes them whenever a road's entry conditions
/// change (admission, arrival, cross step). Iteration over vertices and
/// adjacency lists is deterministic.
#[derive(Debug, Default)]
pub struct RoadNetwork {
    /// One weighted edge per directed road.
    edges: IndexMap<RoadID, Edge>,
    /// Per-crossing outgoing arcs `(neighbor, road)`, sorted by neighbor then road.
    adjacency: IndexMap<CrossID, Vec<(CrossID, RoadID)>>,
    /// Lookup of the directed road joining an ordered crossing pair.
    pair_to_road: HashMap<(CrossID, CrossID), RoadID>,
}

impl RoadNetwork {
    /// Creates a new, empty road network.
    pub fn new() -> Self {
        RoadNetwork::default()
    }

    /// Adds a vertex for the given crossing.
    pub fn add_crossing(&mut self, cross: CrossID) {
        self.adjacency.entry(cross).or_default();
    }

    /// Returns `true` when the crossing is a vertex of the network.
    pub fn contains_crossing(&self, cross: CrossID) -> bool {
        self.adjacency.contains_key(&cross)
    }

    /// Adds one directed edge for the given road, weighted by its free-flow
    /// traversal time `length / speed_limit`.
    ///
    /// # Errors
    /// [`NetworkError::UnknownCrossing`] when either endpoint has not been
    /// added as a vertex.
    pub fn add_road(&mut self, road: &Road) -> Result<(), NetworkError> {
        let (from, to) = (road.get_from_cross(), road.get_to_cross());
        for cross in [from, to] {
            if !self.contains_crossing(cross) {
                return Err(NetworkError::UnknownCrossing {
                    road: road.get_id(),
                    cross,
                });
            }
        }
        let id = road.get_id();
        let weight = road.get_length() as f64 / road.get_speed_limit() as f64;
        self.edges.insert(id, Edge { from, to, weight });

        let arcs = self.adjacency.get_mut(&from).expect("endpoint checked above");
        let arc = (to, id);
        let pos = arcs.partition_point(|existing| *existing < arc);
        arcs.insert(pos, arc);

        // Parallel same-direction roads keep the lowest id deterministic.
        let entry = self.pair_to_road.entry((from, to)).or_insert(id);
        if id < *entry {
            *entry = id;
        }
        Ok(())
    }

    /// Returns the edge carried by the given directed road.
    pub fn edge(&self, road: RoadID) -> Option<&Edge> {
        self.edges.get(&road)
    }

    /// Returns the current weight of the given directed road.
    pub fn weight_of(&self, road: RoadID) -> Option<f64> {
        self.edges.get(&road).map(|edge| edge.weight)
    }

    /// Overwrites the weight of the given directed road.
    pub fn set_weight(&mut self, road: RoadID, weight: f64) {
        if let Some(edge) = self.edges.get_mut(&road) {
            edge.weight = weight;
        }
    }

    /// Recomputes the weight of `road` from its current entry conditions:
    /// `length / entry_speed`, or [`BLOCKED_WEIGHT`] when no lane admits.
    ///
    /// # Returns
    /// The refreshed weight.
    pub fn refresh_weight(&mut self, road: &Road, vehicles: &VehiclesStorage) -> f64 {
        let weight = match road.entry_speed(vehicles) {
            Some(speed) => road.get_length() as f64 / speed as f64,
            None => BLOCKED_WEIGHT,
        };
        self.set_weight(road.get_id(), weight);
        weight
    }

    /// Returns the outgoing arcs of a crossing as `(neighbor, road)` pairs,
    /// sorted by neighbor then road id.
    pub fn neighbors(&self, cross: CrossID) -> &[(CrossID, RoadID)] {
        self.adjacency
            .get(&cross)
            .map(|arcs| arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the directed road joining the ordered crossing pair, if any.
    pub fn road_between(&self, from: CrossID, to: CrossID) -> Option<RoadID> {
        self.pair_to_road.get(&(from, to)).copied()
    }

    /// Returns the weight of the arc joining the ordered crossing pair.
    pub fn arc_weight(&self, from: CrossID, to: CrossID) -> Option<f64> {
        self.road_between(from, to)
            .and_then(|road| self.weight_of(road))
    }

    /// Iterates over all vertices in insertion order.
    pub fn crossings(&self) -> impl Iterator<Item = CrossID> + '_ {
        self.adjacency.keys().copied()
    }

    /// Iterates over all edges as `(road, edge)` pairs in insertion order.
    pub fn iter_edges(&self) -> impl Iterator<Item = (RoadID, &Edge)> {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::vehicle::Vehicle;

    fn road(base: i64, direction: u8, from: CrossID, to: CrossID) -> Road {
        Road::new(RoadID::new(base, direction))
            .with_length(6)
            .with_speed_limit(3)
            .with_lane_count(1)
            .with_endpoints(from, to)
            .build()
    }

    #[test]
    fn test_add_road_requires_vertices() {
        let mut net = RoadNetwork::new();
        net.add_crossing(1);
        let r = road(5, 1, 1, 2);
        let err = net.add_road(&r).unwrap_err();
        assert!(
            matches!(err, NetworkError::UnknownCrossing { cross: 2, .. }),
            "Missing endpoint must be reported, got {}",
            err
        );
    }

    #[test]
    fn test_free_flow_weight_and_lookup() {
        let mut net = RoadNetwork::new();
        net.add_crossing(1);
        net.add_crossing(2);
        net.add_road(&road(5, 1, 1, 2)).unwrap();

        assert_eq!(Some(RoadID::new(5, 1)), net.road_between(1, 2));
        assert_eq!(None, net.road_between(2, 1));
        let weight = net.arc_weight(1, 2).unwrap();
        assert!(
            (weight - 2.0).abs() < f64::EPSILON,
            "Free-flow weight should be length/speed = 2.0, got {}",
            weight
        );
    }

    #[test]
    fn test_refresh_weight_blocked_and_congested() {
        let mut net = RoadNetwork::new();
        net.add_crossing(1);
        net.add_crossing(2);
        let mut r = road(5, 1, 1, 2);
        net.add_road(&r).unwrap();

        let mut vehicles = VehiclesStorage::new();
        for (id, speed) in [(100, 1), (200, 2)] {
            vehicles.insert_vehicle({
                let mut v = Vehicle::new(id).with_max_speed(3).build();
                v.current_speed = speed;
                v
            });
        }

        // A slow tail vehicle drags the weight up.
        r.lane_mut(0).occupy(2, 100);
        let weight = net.refresh_weight(&r, &vehicles);
        assert!(
            (weight - 6.0).abs() < f64::EPSILON,
            "Weight should be length/entry_speed = 6.0, got {}",
            weight
        );

        // A saturated tail blocks the road entirely.
        r.lane_mut(0).occupy(5, 200);
        let weight = net.refresh_weight(&r, &vehicles);
        assert!(
            (weight - BLOCKED_WEIGHT).abs() < f64::EPSILON,
            "Unadmittable road must weigh exactly {}, got {}",
            BLOCKED_WEIGHT,
            weight
        );
    }

    #[test]
    fn test_neighbors_sorted() {
        let mut net = RoadNetwork::new();
        for cross in [1, 2, 3] {
            net.add_crossing(cross);
        }
        net.add_road(&road(9, 1, 1, 3)).unwrap();
        net.add_road(&road(4, 1, 1, 2)).unwrap();
        assert_eq!(
            &[(2, RoadID::new(4, 1)), (3, RoadID::new(9, 1))],
            net.neighbors(1),
            "Adjacency must be sorted by neighbor crossing"
        );
    }
}
