//! # traffic_sched_core
//!
//! Core library for tick-driven traffic scheduling over lane-grid road
//! networks: given crossings, directed roads with lanes, and a batch of
//! vehicles with planned departure times, it produces per-vehicle actual
//! departure times and road sequences under the per-timestep traffic rules.
//!
//! ## Architecture
//!
//! - [`network`] - Lanes as cell arrays, directed roads, crossings with
//!   rotational connector slots, and the weighted routing graph
//! - [`agents`] - Vehicles and their ordered storage
//! - [`routing`] - Dijkstra, k-shortest simple paths and the randomized
//!   departure-road sampler
//! - [`scheduler`] - The tick loop: drive fixed point, cross-phase
//!   right-of-way, stall recovery, invariant checks and admission
//! - [`io`] - Parenthesized CSV input files and the answer writer
//! - [`verbose`] - Leveled JSON logging built on `tracing`
//!
//! ## Example
//!
//! ```rust
//! use traffic_sched_core::scheduler::{Scheduler, config::SchedulerConfig};
//! use traffic_sched_core::utils::fixtures::one_road_entities;
//!
//! let (crosses, roads, cars) = one_road_entities();
//! let config = SchedulerConfig::default().with_rng_seed(42);
//! let mut scheduler = Scheduler::new(crosses, roads, cars, config).unwrap();
//! scheduler.run().unwrap();
//! assert_eq!(scheduler.arrived().len(), 1);
//! ```
//!
//! Runs are deterministic: identical inputs and seed produce byte-identical
//! answers.
pub mod agents;
pub mod io;
pub mod network;
pub mod routing;
pub mod scheduler;
pub mod utils;
pub mod verbose;
