//! Misc utilities.

mod meter;

pub use meter::*;
