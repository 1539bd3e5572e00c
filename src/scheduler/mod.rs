//! # Scheduler Module
//!
//! The tick-driven core: per time unit it advances every on-network vehicle
//! as far as its lane allows (drive fixed point), resolves right-of-way at
//! crossings in id order (cross phase), recovers mutually blocked vehicles
//! by parking them at their lane heads, verifies the universal invariants of
//! the shared occupancy grid, and admits garaged vehicles while the network
//! has capacity to spare.
//!
//! ## Key Components
//!
//! - [`Scheduler`] - Run state, construction and the tick loop
//! - [`config::SchedulerConfig`] - Tunable constants of a run
//! - [`invariants::InvariantError`] - Fatal bookkeeping inconsistencies
//!
//! ## Ordering guarantees
//!
//! Within a tick the drive phase completes before the cross phase and the
//! cross phase before admission; the clock increments last. All scans visit
//! crossings ascending by id, incoming roads ascending by base id, lanes
//! ascending by index and cells head-first; admission enumerates due
//! vehicles ascending by id. Together with the seeded generator this makes
//! runs reproducible byte for byte.
pub mod config;
mod cross_pass;
mod drive;
pub mod invariants;
pub mod scheduler;

pub use self::scheduler::{Scheduler, SchedulerError};
