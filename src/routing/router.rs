use crate::network::crossing::CrossID;
use crate::network::graph::RoadNetwork;
use crate::routing::path::Path;
use indexmap::IndexMap;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
    fmt,
};

// Define custom error types
#[derive(Debug)]
pub enum RouterError {
    NoPathFound { from: CrossID, to: CrossID },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::NoPathFound { from, to } => {
                write!(
                    f,
                    "No shortest path has been found between crossings {} and {}",
                    from, to
                )
            }
        }
    }
}

impl std::error::Error for RouterError {}

// Frontier entry for the Dijkstra search
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    cross: CrossID,
    cost: f64,
}

// For implementing min-heap

impl PartialEq for SearchNode {
    fn eq(&self, other: &SearchNode) -> bool {
        self.cost == other.cost
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &SearchNode) -> Ordering {
        let cost_cmp = other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal);
        if cost_cmp == Ordering::Equal {
            return other.cross.cmp(&self.cross); // Break tie by crossing id
        }
        cost_cmp
    }
}

/// Computes the lowest-cost path between two crossings under the current
/// edge weights (Dijkstra's algorithm).
///
/// # Arguments
/// * `net` - The weighted road network.
/// * `from` - Source crossing id.
/// * `to` - Target crossing id.
///
/// # Returns
/// The cheapest [`Path`], or [`RouterError::NoPathFound`] when the target is
/// unreachable. A trivial `from == to` query yields a single-vertex path of
/// cost zero.
pub fn shortest_path(net: &RoadNetwork, from: CrossID, to: CrossID) -> Result<Path, RouterError> {
    shortest_path_constrained(net, from, to, &HashSet::new(), &HashSet::new())
}

/// Dijkstra search with removed vertices and arcs; backs both the plain
/// query and the spur searches of the k-shortest enumeration.
fn shortest_path_constrained(
    net: &RoadNetwork,
    from: CrossID,
    to: CrossID,
    banned_crosses: &HashSet<CrossID>,
    banned_arcs: &HashSet<(CrossID, CrossID)>,
) -> Result<Path, RouterError> {
    let mut open_set = BinaryHeap::new();
    let mut best_cost: IndexMap<CrossID, f64> = IndexMap::new();
    let mut came_from: IndexMap<CrossID, CrossID> = IndexMap::new();

    best_cost.insert(from, 0.0);
    open_set.push(SearchNode {
        cross: from,
        cost: 0.0,
    });

    while let Some(current) = open_set.pop() {
        let settled = *best_cost.get(&current.cross).unwrap_or(&f64::INFINITY);
        if current.cost > settled {
            continue; // stale frontier entry
        }
        if current.cross == to {
            return Ok(reconstruct_path(&came_from, from, to, current.cost));
        }
        for (neighbor, road) in net.neighbors(current.cross) {
            if banned_crosses.contains(neighbor)
                || banned_arcs.contains(&(current.cross, *neighbor))
            {
                continue;
            }
            let Some(weight) = net.weight_of(*road) else {
                continue;
            };
            let tentative = current.cost + weight;
            if tentative < *best_cost.get(neighbor).unwrap_or(&f64::INFINITY) {
                best_cost.insert(*neighbor, tentative);
                came_from.insert(*neighbor, current.cross);
                open_set.push(SearchNode {
                    cross: *neighbor,
                    cost: tentative,
                });
            }
        }
    }

    Err(RouterError::NoPathFound { from, to })
}

/// Reconstructs the path from the target to the source by following the
/// predecessor pointers.
fn reconstruct_path(
    came_from: &IndexMap<CrossID, CrossID>,
    from: CrossID,
    to: CrossID,
    cost: f64,
) -> Path {
    let mut vertices = vec![to];
    let mut current = to;
    while current != from {
        match came_from.get(&current) {
            Some(prev) => {
                vertices.push(*prev);
                current = *prev;
            }
            None => break,
        }
    }
    vertices.reverse();
    Path::new(vertices, cost)
}

/// Returns the cost of a crossing sequence under the current edge weights,
/// or `None` when some consecutive pair has no connecting road.
pub fn path_cost(net: &RoadNetwork, vertices: &[CrossID]) -> Option<f64> {
    vertices
        .windows(2)
        .map(|pair| net.arc_weight(pair[0], pair[1]))
        .sum()
}

/// Enumerates simple paths between two crossings in non-decreasing cost
/// (Yen's algorithm).
///
/// # Arguments
/// * `net` - The weighted road network.
/// * `from` - Source crossing id.
/// * `to` - Target crossing id.
/// * `keep_max` - Upper bound on paths returned.
/// * `probe_max` - Upper bound on spur searches spent.
///
/// # Returns
/// Up to `keep_max` distinct simple paths, cheapest first; empty when the
/// target is unreachable.
pub fn k_shortest_paths(
    net: &RoadNetwork,
    from: CrossID,
    to: CrossID,
    keep_max: usize,
    probe_max: usize,
) -> Vec<Path> {
    let Ok(first) = shortest_path(net, from, to) else {
        return Vec::new();
    };
    let mut kept = vec![first];
    let mut candidates: Vec<Path> = Vec::new();
    let mut probes = 0usize;

    while kept.len() < keep_max && probes < probe_max {
        let prev_vertices = kept
            .last()
            .map(|path| path.vertices().to_vec())
            .unwrap_or_default();

        for i in 0..prev_vertices.len().saturating_sub(1) {
            if probes >= probe_max {
                break;
            }
            probes += 1;

            let spur_cross = prev_vertices[i];
            let root = &prev_vertices[..=i];

            // Arcs already used by kept paths sharing this root must not be
            // retaken; root vertices must not be revisited (simple paths).
            let mut banned_arcs = HashSet::new();
            for path in &kept {
                let v = path.vertices();
                if v.len() > i + 1 && v[..=i] == *root {
                    banned_arcs.insert((v[i], v[i + 1]));
                }
            }
            let banned_crosses: HashSet<CrossID> = root[..i].iter().copied().collect();

            let Ok(spur_path) =
                shortest_path_constrained(net, spur_cross, to, &banned_crosses, &banned_arcs)
            else {
                continue;
            };

            let mut vertices = root[..i].to_vec();
            vertices.extend_from_slice(spur_path.vertices());
            let Some(cost) = path_cost(net, &vertices) else {
                continue;
            };
            let duplicate = kept
                .iter()
                .chain(candidates.iter())
                .any(|path| path.vertices() == vertices.as_slice());
            if !duplicate {
                candidates.push(Path::new(vertices, cost));
            }
        }

        if candidates.is_empty() {
            break;
        }
        let best = candidates
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.cost()
                    .partial_cmp(&b.cost())
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.vertices().cmp(b.vertices()))
            })
            .map(|(index, _)| index)
            .unwrap_or(0);
        kept.push(candidates.remove(best));
    }

    kept
}
