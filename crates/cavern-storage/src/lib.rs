//! # Cavern Storage
//!
//! Valuation of physical commodity storage (gas caverns, tanks, reservoirs).
//!
//! - **Model**: [`StorageModel`] built from a validated [`StorageSpec`],
//!   with rate constraints from a pillar table or independent bounds
//! - **Intrinsic**: optimal operation against the forward curve with a
//!   realised decision profile, see [`intrinsic_value`]
//! - **Trinomial**: optimal operation under a one-factor mean-reverting
//!   spot price, see [`trinomial_value`]
//!
//! Both engines run a backward induction over a per-period inventory grid
//! restricted to the reachable and terminally feasible inventory space.
//! With the `parallel` feature the grid points (and tree nodes) of a period
//! are valued on the rayon thread pool.
//!
//! ## Example
//!
//! ```rust
//! use cavern_core::prelude::*;
//! use cavern_storage::prelude::*;
//!
//! let start = Period::day(2019, 9, 1).unwrap();
//! let end = start.offset(30);
//! let model = StorageModel::new(
//!     StorageSpec::new(
//!         Granularity::Daily,
//!         start,
//!         end,
//!         ConstraintSpec::independent(0.0, 1000.0, 100.0, 100.0),
//!     )
//!     .with_injection_cost(PerUnitCost::new(0.01))
//!     .with_withdrawal_cost(PerUnitCost::new(0.01)),
//! )
//! .unwrap();
//!
//! let forward = TimeSeries::from_fn(start, end, |p| {
//!     if p.offset_from(&start).unwrap() < 15 { 20.0 } else { 22.0 }
//! })
//! .unwrap();
//! let curve = FlatRateCurve::new(0.03);
//! let market = MarketInputs::new(start.start_date(), &forward, &curve, &PeriodStart);
//! let config = ValuationConfig::default().with_num_grid_points(11);
//!
//! let intrinsic = intrinsic_value(&model, &market, 0.0, &config).unwrap();
//! assert!(intrinsic.npv > 0.0);
//!
//! let vols = TimeSeries::new(start, vec![0.5; 30]);
//! let tree = trinomial_value(&model, &market, 0.0, &vols, &TrinomialParams::new(10.0), &config)
//!     .unwrap();
//! assert!(tree.npv > 0.0);
//! ```

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
#![allow(clippy::float_cmp)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod constraint;
pub mod costs;
mod decision;
pub mod error;
pub mod grid;
pub mod intrinsic;
pub mod market;
pub mod model;
pub mod parallel;
mod series;
pub mod space;
pub mod tree;

pub use series::ScalarOrSeries;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{TrinomialParams, ValuationConfig};
    pub use crate::constraint::{InjectWithdrawRange, InventoryPillar, PillarInterpolation};
    pub use crate::costs::{CostComponent, PerUnitCost, TerminalValue};
    pub use crate::error::{StorageError, StorageResult, ToleranceWarning};
    pub use crate::grid::GridSpec;
    pub use crate::intrinsic::{intrinsic_value, IntrinsicResult, ProfileRow};
    pub use crate::market::MarketInputs;
    pub use crate::model::{ConstraintSpec, PillarRow, StorageModel, StorageSpec};
    pub use crate::series::ScalarOrSeries;
    pub use crate::tree::{tree_value, trinomial_value, TreeResult, TrinomialTree};
}

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult, ToleranceWarning};
pub use intrinsic::{intrinsic_value, IntrinsicResult};
pub use model::{StorageModel, StorageSpec};
pub use tree::{trinomial_value, TreeResult};
