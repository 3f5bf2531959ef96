//! # Cavern Math
//!
//! Numerical utilities for the Cavern commodity storage valuation library.
//!
//! - **Interpolation**: linear interpolation over sorted abscissae, with an
//!   edge tolerance for values that overshoot by rounding error
//! - **Solvers**: Brent root finding
//! - **Polynomials**: exact fits through pillar points via nalgebra
//! - **Grids**: evenly and fixed spaced point sets

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod grid;
pub mod interpolation;
pub mod polynomial;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::grid::{fixed_spacing, linspace};
    pub use crate::interpolation::interpolate_sorted;
    pub use crate::polynomial::Polynomial;
    pub use crate::solvers::{brent, SolverConfig, SolverResult};
}

pub use error::{MathError, MathResult};
