//! # Cavern Core
//!
//! Periods, time series, dates and discounting for the Cavern commodity
//! storage valuation library.
//!
//! - **Types**: [`Period`] with an explicit [`Granularity`], contiguous
//!   [`TimeSeries`], and calendar [`Date`]
//! - **Day Counts**: ACT/365F
//! - **Discounting**: daily zero-rate curves and flat curves
//! - **Settlement**: rules mapping a delivery period to its payment date
//!
//! ## Example
//!
//! ```rust
//! use cavern_core::prelude::*;
//!
//! let start = Period::day(2019, 9, 1).unwrap();
//! let forward = TimeSeries::new(start, vec![58.89, 61.41]);
//! assert_eq!(forward.granularity(), Granularity::Daily);
//!
//! let curve = FlatRateCurve::new(0.03);
//! let today = start.start_date();
//! let df = curve.discount_factor(today, today.add_days(365)).unwrap();
//! assert!((df - (-0.03_f64).exp()).abs() < 1e-12);
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
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::similar_names)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::uninlined_format_args)]

pub mod daycounts;
pub mod discount;
pub mod error;
pub mod settlement;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::daycounts::{Act365Fixed, DayCount};
    pub use crate::discount::{DiscountCurve, FlatRateCurve, RateCurve};
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::settlement::{NextMonthOnDay, PeriodStart, SettlementRule};
    pub use crate::types::{Date, Granularity, Period, TimeSeries};
}

// Re-export commonly used types at crate root
pub use error::{CoreError, CoreResult};
pub use types::{Date, Granularity, Period, TimeSeries};
