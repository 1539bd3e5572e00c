// src/agents/mod.rs
//! # Agents Module
//!
//! This module provides the vehicle agents of the scheduling batch and their
//! id-keyed ordered storage.
//!
//! ## Key Components
//!
//! - [`Vehicle`] - One car: static trip attributes plus runtime progress
//! - [`VehiclePhase`] - Closed per-tick scheduling phase
//! - [`VehiclesStorage`] - Deterministically ordered id → vehicle store
//!
//! ## Usage
//!
//! ```rust
//! use traffic_sched_core::agents::{Vehicle, VehiclesStorage};
//!
//! let mut storage = VehiclesStorage::new();
//! storage.insert_vehicle(
//!     Vehicle::new(1)
//!         .with_origin(10)
//!         .with_destination(20)
//!         .with_max_speed(4)
//!         .with_planned_departure(0)
//!         .build(),
//! );
//! ```
pub mod vehicle;
pub mod vehicles_storage;

pub use self::{vehicle::*, vehicles_storage::*};
