//! # IO Module
//!
//! Line-oriented parenthesized CSV input (cars, roads, crossings) and the
//! answer writer. Parsing reports the file and 1-based line of the first
//! malformed record; duplex road records split into their two directed
//! roads here, before the scheduler ever sees them.
pub mod reader;
pub mod writer;

pub use self::{reader::*, writer::*};
