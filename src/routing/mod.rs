//! # Routing Module
//!
//! Shortest-path machinery over the dynamic-weight road graph: a Dijkstra
//! query, an enumeration of simple paths in non-decreasing cost (Yen's
//! algorithm) with keep/probe caps, and the randomized first-road sampler
//! used by the admission phase.
//!
//! Edge weights belong to [`crate::network::graph::RoadNetwork`] and change
//! between ticks; every cost here is computed from the weights current at
//! call time.
pub mod path;
pub mod router;
pub mod sampler;

pub use self::{path::*, router::*, sampler::*};
