use crate::network::crossing::CrossID;
use crate::network::graph::RoadNetwork;
use crate::network::road::{RoadID, RoadState};
use crate::routing::path::Path;
use crate::routing::router::k_shortest_paths;
use crate::utils::rand::weighted_choice;
use rand::Rng;

/// Picks the first road a departing vehicle drives onto.
///
/// With probability `p_ideal` the first road of `ideal` is taken when its
/// state is not [`RoadState::Blocked`]. Otherwise a draw is made among the
/// first roads of up to `keep_max` alternative simple paths (probing at most
/// `probe_max`), each path weighted by the inverse of its cost under the
/// current edge weights. Blocked first roads never participate.
///
/// # Arguments
/// * `net` - The weighted road network.
/// * `from` - The crossing the vehicle departs from.
/// * `dest` - The trip destination.
/// * `ideal` - The precomputed cheapest path `from → dest`.
/// * `p_ideal` - Probability of preferring the ideal path when open.
/// * `keep_max` / `probe_max` - Alternative-path enumeration caps.
/// * `road_state` - Resolves the admission state of a directed road.
/// * `rng` - The seeded run generator.
///
/// # Returns
/// The chosen first road, or `None` when every candidate is blocked.
pub fn sample_first_road<F>(
    net: &RoadNetwork,
    from: CrossID,
    dest: CrossID,
    ideal: &Path,
    p_ideal: f64,
    keep_max: usize,
    probe_max: usize,
    road_state: F,
    rng: &mut impl Rng,
) -> Option<RoadID>
where
    F: Fn(RoadID) -> RoadState,
{
    let ideal_road = ideal
        .first_hop()
        .and_then(|(hop_from, hop_to)| net.road_between(hop_from, hop_to));
    let ideal_open = ideal_road
        .map(|road| road_state(road) != RoadState::Blocked)
        .unwrap_or(false);

    // Alternative candidates: every enumerated simple path except the ideal
    // one whose first road currently accepts traffic.
    let mut candidates: Vec<(RoadID, f64)> = Vec::new();
    for path in k_shortest_paths(net, from, dest, keep_max, probe_max) {
        if path.vertices() == ideal.vertices() {
            continue;
        }
        let Some((hop_from, hop_to)) = path.first_hop() else {
            continue;
        };
        let Some(road) = net.road_between(hop_from, hop_to) else {
            continue;
        };
        if road_state(road) == RoadState::Blocked {
            continue;
        }
        candidates.push((road, path.cost()));
    }

    if candidates.is_empty() {
        return if ideal_open { ideal_road } else { None };
    }
    if ideal_open && rng.random::<f64>() < p_ideal {
        return ideal_road;
    }

    let weights: Vec<f64> = candidates.iter().map(|(_, cost)| 1.0 / cost).collect();
    weighted_choice(&weights, rng).map(|index| candidates[index].0)
}
