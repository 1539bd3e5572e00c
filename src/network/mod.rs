//! # Network Module
//!
//! This module provides the static road network for the scheduler: lanes as
//! fixed-length cell arrays, directed roads owning those lanes, crossings
//! with four rotational connector slots, and a weighted directed graph view
//! used for routing.
//!
//! ## Key Components
//!
//! - [`lane::Lane`] - Cell array with occupancy and neighbor queries
//! - [`road::Road`] - Directed road segment owning its lanes
//! - [`road::RoadID`] - Direction-split road identity (`"<base>#<dir>"`)
//! - [`crossing::Crossing`] - Connector slots and turn classification
//! - [`graph::RoadNetwork`] - Dynamic-weight graph over crossings and roads
//!
//! ## Geometry conventions
//!
//! Cell index 0 is a lane's head, adjacent to the road's downstream
//! crossing; the highest index is the tail, where vehicles enter. A duplex
//! input road materializes as two directed [`road::Road`] entities, one per
//! direction.
//!
//! ## Usage
//!
//! ```rust
//! use traffic_sched_core::network::road::{Road, RoadID};
//!
//! let road = Road::new(RoadID::new(7, 1))
//!     .with_length(5)
//!     .with_speed_limit(3)
//!     .with_lane_count(2)
//!     .with_endpoints(1, 2)
//!     .build();
//! assert_eq!(road.capacity(), 10);
//! ```
pub mod crossing;
pub mod graph;
pub mod lane;
pub mod road;
