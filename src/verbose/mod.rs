//! # Verbose Module
//!
//! Leveled debugging output for the scheduler,
//! using the `tracing` crate with JSON output format.
//!
//! The global [`VerboseLevel`] gates the `log_main!` / `log_additional!` /
//! `log_detailed!` / `log_all!` macros; the subscriber is initialized once,
//! typically by the CLI binary.
pub mod verbose;

pub use self::verbose::*;
