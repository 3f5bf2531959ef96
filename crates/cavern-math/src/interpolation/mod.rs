//! Interpolation of value functions and rate bounds over inventory.
//!
//! Storage constraints and value functions are both piecewise linear in
//! inventory, so linear interpolation over borrowed, sorted slices is all the
//! valuation sweeps need. Value grids are rebuilt every period, so nothing
//! is copied into an owning interpolator.

mod linear;

pub use linear::interpolate_sorted;
