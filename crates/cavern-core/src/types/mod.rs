//! Domain types: dates, granularities, periods and time series.

pub(crate) mod date;
mod granularity;
mod period;
mod time_series;

pub use date::Date;
pub use granularity::Granularity;
pub use period::Period;
pub use time_series::TimeSeries;
